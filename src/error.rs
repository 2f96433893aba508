use thiserror::Error;

use crate::auth::ValidationErrors;

/// Message surfaced when a request never got a response.
pub const NETWORK_MESSAGE: &str = "Unable to reach the server. Please check your connection.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),
}

impl AppError {
    /// The single human-readable message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::AuthError(e) => e.user_message().to_string(),
            AppError::ApiError(e) => e.message.clone(),
            AppError::StorageError(_) => "Unable to access the local session storage".to_string(),
            AppError::NetworkError(_) => NETWORK_MESSAGE.to_string(),
            AppError::ClientError(detail) => format!("Client Error: {}", detail),
            AppError::Rejected(message) => message.clone(),
            AppError::ConfigError(message) => message.clone(),
            AppError::ValidationError(errors) => errors.to_string(),
        }
    }

    /// HTTP status of the backend response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::ApiError(e) => Some(e.status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_decode() {
            AppError::ClientError(err.to_string())
        } else {
            AppError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ClientError(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::ConfigError(format!("Invalid API URL: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(StorageError::Io(err.to_string()))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

impl AuthError {
    pub fn user_message(&self) -> &str {
        match self {
            AuthError::NotAuthenticated => "User not authenticated",
            AuthError::NoRefreshToken => "No refresh token available",
            AuthError::RefreshFailed(message) => message,
            AuthError::TokenExpired => "Your session has expired - Please login",
        }
    }
}

/// A non-success HTTP response, already normalized to one user-facing message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt storage file: {0}")]
    Corrupt(String),
}
