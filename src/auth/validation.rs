use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::auth::models::{PasswordChange, RegisterRequest, ResetPasswordRequest};

pub const LOGIN_PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const NAME_MIN_LEN: usize = 2;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern is valid"))
}

/// Field-level form errors, keyed by the request field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first error for a field; later ones are ignored.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &'static str, value: &str, label: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, format!("{} is required", label));
            false
        } else {
            true
        }
    }

    fn min_len(&mut self, field: &'static str, value: &str, label: &str, min: usize) {
        if self.required(field, value, label) && value.chars().count() < min {
            self.add(field, format!("{} must be at least {} characters", label, min));
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if self.required(field, value, "Email") && !is_valid_email(value) {
            self.add(field, "Please enter a valid email address");
        }
    }

    fn confirmation(&mut self, password: &str, confirm: &str) {
        if self.required("confirmPassword", confirm, "Password confirmation") && password != confirm {
            self.add("confirmPassword", "Passwords do not match");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.fields.values().map(String::as_str).collect();
        write!(f, "{}", messages.join("; "))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value.trim())
}

pub fn is_valid_phone(value: &str) -> bool {
    phone_pattern().is_match(value.trim())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.email("email", email);
    errors.min_len("password", password, "Password", LOGIN_PASSWORD_MIN_LEN);
    errors.into_result()
}

pub fn validate_email_only(email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.email("email", email);
    errors.into_result()
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.min_len("firstName", &request.first_name, "First name", NAME_MIN_LEN);
    errors.min_len("lastName", &request.last_name, "Last name", NAME_MIN_LEN);
    errors.email("email", &request.email);
    if let Some(phone) = request.phone_number.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_valid_phone(phone) {
            errors.add("phoneNumber", "Please enter a valid phone number");
        }
    }
    errors.min_len("password", &request.password, "Password", PASSWORD_MIN_LEN);
    errors.confirmation(&request.password, &request.confirm_password);
    errors.into_result()
}

pub fn validate_password_reset(request: &ResetPasswordRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.required("token", &request.token, "Reset token");
    errors.min_len("newPassword", &request.new_password, "New password", PASSWORD_MIN_LEN);
    errors.confirmation(&request.new_password, &request.confirm_password);
    errors.into_result()
}

pub fn validate_password_change(change: &PasswordChange) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.required("currentPassword", &change.current_password, "Current password");
    errors.min_len("newPassword", &change.new_password, "New password", PASSWORD_MIN_LEN);
    errors.confirmation(&change.new_password, &change.confirm_password);
    errors.into_result()
}
