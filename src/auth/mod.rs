//! Authentication module for the SkillUp client
//!
//! Session lifecycle against the `/Auth/*` endpoints, token inspection and
//! client-side form validation.

pub mod models;
mod service;
pub mod token;
pub mod validation;

pub use models::{
    ApiResult, AuthResult, ForgotPasswordRequest, LoginRequest, PasswordChange, RegisterOutcome,
    RegisterRequest, ResetPasswordRequest, Role, User, ValidateResetTokenRequest,
};
pub use service::{AuthClient, TokenCheck};
pub use validation::ValidationErrors;
