use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account snapshot as the backend returns it. Never edited locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<String>,
    pub role: String,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Case-insensitive role comparison.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Creator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Creator => "Creator",
            Role::Admin => "Admin",
        }
    }
}

/// Body of `/Auth/login` and `/Auth/register`, and the payload of `/Auth/refresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthResult {
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Generic `{ success, message, data, errors }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// How a successful registration ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    /// The backend logged the new account in; the session is live.
    SignedIn(User),
    /// No token came back; the account must be confirmed by email first.
    VerificationRequired { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResetTokenRequest {
    pub email: String,
    pub token: String,
}

/// Password change form. The auth client adds the user id from the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest<'a> {
    pub user_id: i64,
    #[serde(flatten)]
    pub change: &'a PasswordChange,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_json() -> serde_json::Value {
        json!({
            "id": 7,
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "role": "Student",
            "isEmailVerified": true,
            "createdAt": "2024-01-02T03:04:05Z",
            "isActive": true
        })
    }

    #[test]
    fn test_user_from_backend_json() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert!(user.has_role("student"));
        assert!(user.has_role(Role::Student.as_str()));
        assert!(!user.has_role("Admin"));
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn test_auth_result_without_token() {
        let result: AuthResult = serde_json::from_value(json!({
            "success": true,
            "message": "Check your inbox"
        }))
        .unwrap();
        assert!(result.success);
        assert!(result.token.is_none());
        assert!(result.user.is_none());
        assert_eq!(result.message_or("fallback"), "Check your inbox");
    }

    #[test]
    fn test_register_request_never_sends_confirmation() {
        let request = RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
            confirm_password: "correct horse".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("confirmPassword").is_none());
        assert!(body.get("phoneNumber").is_none());
        assert_eq!(body["firstName"], "Ada");
    }

    #[test]
    fn test_change_password_request_shape() {
        let change = PasswordChange {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
            confirm_password: "new-password".to_string(),
        };
        let body = serde_json::to_value(ChangePasswordRequest { user_id: 7, change: &change }).unwrap();
        assert_eq!(body["userId"], 7);
        assert_eq!(body["currentPassword"], "old-password");
        assert_eq!(body["confirmPassword"], "new-password");
    }
}
