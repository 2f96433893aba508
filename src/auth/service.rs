use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::models::{
    ApiResult, AuthResult, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
    PasswordChange, RefreshTokenRequest, RegisterOutcome, RegisterRequest, ResendVerificationRequest,
    ResetPasswordRequest, Role, User, ValidateResetTokenRequest, VerifyEmailRequest,
};
use crate::auth::{token, validation};
use crate::error::{AppError, AuthError};
use crate::http::{ApiRequest, HttpTransport, RefreshCoordinator, TokenRefresher};
use crate::navigation::{Navigation, Navigator};
use crate::session::{Session, SessionState};
use crate::storage::TokenStore;

const VERIFY_EMAIL_MESSAGE: &str = "Please check your email to activate your account";

/// Outcome of [`AuthClient::check_token_expiration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    NoToken,
    /// The stored token could not be decoded; the session was cleared.
    Invalid,
    /// Already past `exp`. Left for the 401 path to deal with.
    Expired,
    Valid,
    Refreshed,
    /// Refresh failed; the session was cleared and login requested.
    RefreshFailed,
}

/// The only code path that mutates the stored or published session.
#[derive(Clone)]
struct SessionWriter {
    tokens: TokenStore,
    state: Arc<SessionState>,
    navigator: Navigator,
}

impl SessionWriter {
    /// Saves and publishes the session carried by `result`. Returns `None`
    /// without touching anything when the token or user is missing.
    fn establish(&self, result: &AuthResult) -> Result<Option<User>, AppError> {
        let token = result.token.as_deref().filter(|t| !t.is_empty());
        let (Some(token), Some(user)) = (token, result.user.as_ref()) else {
            warn!("Auth result is missing the token or user");
            return Ok(None);
        };

        let session = Session::authenticated(
            user.clone(),
            token.to_string(),
            result.refresh_token.clone().filter(|t| !t.is_empty()),
            result.expires_at,
        );
        self.tokens.save(&session)?;
        self.state.publish(session);
        info!("Session established for user {}", user.id);
        Ok(Some(user.clone()))
    }

    fn clear(&self) {
        if let Err(e) = self.tokens.clear() {
            error!("Failed to clear stored session: {}", e);
        }
        self.state.clear();
    }

    fn expire(&self) {
        self.clear();
        self.navigator.navigate(Navigation::login());
    }
}

/// `/Auth/refresh` exchange handed to the refresh coordinator.
struct RefreshExchange {
    transport: HttpTransport,
    writer: SessionWriter,
}

impl RefreshExchange {
    async fn exchange(&self) -> Result<String, AppError> {
        let refresh_token = self
            .writer
            .tokens
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        let body = RefreshTokenRequest {
            refresh_token: refresh_token.clone(),
        };
        let request = ApiRequest::post("/Auth/refresh", &body)?;
        let envelope: ApiResult<AuthResult> = self.transport.execute(&request).await?.json()?;

        let rejected = || {
            let message = envelope
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("Token refresh failed");
            AppError::Rejected(message.to_string())
        };
        if !envelope.success {
            return Err(rejected());
        }
        let mut result = envelope.data.clone().ok_or_else(rejected)?;
        let token = result.token.clone().filter(|t| !t.is_empty()).ok_or_else(rejected)?;

        // The refresh response may omit what did not change.
        if result.user.is_none() {
            result.user = self.writer.tokens.user();
        }
        if result.refresh_token.is_none() {
            result.refresh_token = Some(refresh_token);
        }

        self.writer.establish(&result)?.ok_or_else(rejected)?;
        Ok(token)
    }
}

#[async_trait]
impl TokenRefresher for RefreshExchange {
    async fn refresh_access_token(&self) -> Result<String, AppError> {
        let outcome = self.exchange().await;
        if outcome.is_err() {
            self.writer.clear();
        }
        outcome
    }

    async fn force_logout(&self) {
        self.writer.expire();
    }
}

/// Owns the session lifecycle: login, registration, logout, refresh and the
/// stateless `/Auth/*` pass-throughs.
#[derive(Clone)]
pub struct AuthClient {
    transport: HttpTransport,
    writer: SessionWriter,
    refresh: Arc<RefreshCoordinator>,
    refresh_threshold: Duration,
}

impl AuthClient {
    pub fn new(
        transport: HttpTransport,
        tokens: TokenStore,
        state: Arc<SessionState>,
        navigator: Navigator,
        refresh_threshold: Duration,
    ) -> Self {
        let writer = SessionWriter {
            tokens,
            state,
            navigator,
        };
        let exchange = RefreshExchange {
            transport: transport.clone(),
            writer: writer.clone(),
        };

        Self {
            transport,
            writer,
            refresh: Arc::new(RefreshCoordinator::new(Arc::new(exchange))),
            refresh_threshold,
        }
    }

    /// Publishes the stored session if its token is still valid, else clears it.
    pub fn restore(&self) {
        let session = self.writer.tokens.load();
        match session.access_token() {
            Some(access_token) if !token::is_token_expired(access_token) => {
                info!("Restored stored session");
                self.writer.state.publish(session);
            }
            _ => {
                debug!("No usable stored session");
                self.writer.clear();
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<User, AppError> {
        validation::validate_login(email, password)?;
        info!("Logging in {}", email);

        let request = ApiRequest::post(
            "/Auth/login",
            &LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
                remember_me,
            },
        )?;
        let result: AuthResult = self.call(request).await?.json()?;

        if !result.success {
            warn!("Login rejected for {}", email);
            return Err(AppError::Rejected(result.message_or("Login failed")));
        }
        self.writer
            .establish(&result)?
            .ok_or_else(|| AppError::Rejected(result.message_or("Login failed")))
    }

    /// Signs in, then sends the user back to `return_url` or the dashboard.
    pub async fn login_and_resume(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        return_url: Option<&str>,
    ) -> Result<User, AppError> {
        let user = self.login(email, password, remember_me).await?;
        self.writer.navigator.navigate(Navigation::after_login(return_url));
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterOutcome, AppError> {
        validation::validate_registration(request)?;
        info!("Registering {}", request.email);

        let result: AuthResult = self
            .call(ApiRequest::post("/Auth/register", request)?)
            .await?
            .json()?;

        if !result.success {
            return Err(AppError::Rejected(result.message_or("Registration failed")));
        }

        match self.writer.establish(&result)? {
            Some(user) => {
                self.writer.navigator.navigate(Navigation::Dashboard);
                Ok(RegisterOutcome::SignedIn(user))
            }
            None => {
                info!("Registration for {} awaits email verification", request.email);
                self.writer.navigator.navigate(Navigation::CheckEmail);
                Ok(RegisterOutcome::VerificationRequired {
                    message: result.message_or(VERIFY_EMAIL_MESSAGE),
                })
            }
        }
    }

    /// Tells the backend, then clears local state whatever it answered.
    pub async fn logout(&self) {
        let bearer = self.writer.tokens.access_token();
        match ApiRequest::post("/Auth/logout", &json!({})) {
            Ok(request) => {
                if let Err(e) = self.transport.execute(&request.with_bearer(bearer)).await {
                    warn!("Logout request failed, clearing locally: {}", e);
                }
            }
            Err(e) => warn!("Failed to build logout request: {}", e),
        }

        self.writer.expire();
        info!("Logged out");
    }

    /// Returns the new access token. Concurrent callers share one exchange.
    pub async fn refresh_token(&self) -> Result<String, AppError> {
        Ok(self.refresh.refresh().await?)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiResult<bool>, AppError> {
        validation::validate_email_only(email)?;
        let body = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        self.pass_through("/Auth/forgot-password", &body).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiResult<bool>, AppError> {
        validation::validate_password_reset(request)?;
        self.pass_through("/Auth/reset-password", request).await
    }

    pub async fn validate_reset_token(
        &self,
        request: &ValidateResetTokenRequest,
    ) -> Result<ApiResult<bool>, AppError> {
        self.pass_through("/Auth/validate-reset-token", request).await
    }

    pub async fn verify_email(&self, verification_token: &str) -> Result<ApiResult<bool>, AppError> {
        let body = VerifyEmailRequest {
            token: verification_token.to_string(),
        };
        self.pass_through("/Auth/verify-email", &body).await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<ApiResult<bool>, AppError> {
        validation::validate_email_only(email)?;
        let body = ResendVerificationRequest {
            email: email.trim().to_string(),
        };
        self.pass_through("/Auth/resend-verification", &body).await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<ApiResult<bool>, AppError> {
        validation::validate_password_change(change)?;

        let tokens = &self.writer.tokens;
        let (Some(access_token), Some(user_id)) = (tokens.access_token(), tokens.user_id()) else {
            return Err(AuthError::NotAuthenticated.into());
        };

        let body = ChangePasswordRequest { user_id, change };
        let request = ApiRequest::post("/Auth/change-password", &body)?.with_bearer(Some(access_token));
        self.call(request).await?.json()
    }

    async fn pass_through<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResult<bool>, AppError> {
        self.call(ApiRequest::post(path, body)?).await?.json()
    }

    /// Auth endpoints bypass 401 recovery: a 401 on a call made with the
    /// stored token ends the session.
    async fn call(&self, request: ApiRequest) -> Result<crate::http::ApiResponse, AppError> {
        match self.transport.execute(&request).await {
            Err(e) if e.is_unauthorized() && request.bearer.is_some() => {
                warn!("Session rejected by {}", request.path);
                self.writer.expire();
                Err(e)
            }
            outcome => outcome,
        }
    }

    /// Refreshes a token that is about to expire.
    pub async fn check_token_expiration(&self) -> TokenCheck {
        let Some(access_token) = self.writer.tokens.access_token() else {
            return TokenCheck::NoToken;
        };

        let Some(remaining) = token::time_until_expiry(&access_token, Utc::now()) else {
            warn!("Stored token is unreadable, clearing session");
            self.writer.clear();
            return TokenCheck::Invalid;
        };

        if remaining <= Duration::zero() {
            return TokenCheck::Expired;
        }
        if remaining >= self.refresh_threshold {
            return TokenCheck::Valid;
        }

        debug!("Token expires in {}s, refreshing", remaining.num_seconds());
        match self.refresh.refresh().await {
            Ok(_) => TokenCheck::Refreshed,
            // The coordinator has already ended the session.
            Err(_) => TokenCheck::RefreshFailed,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.writer
            .tokens
            .access_token()
            .map_or(false, |t| !token::is_token_expired(&t))
    }

    pub fn is_token_expired(&self, access_token: &str) -> bool {
        token::is_token_expired(access_token)
    }

    pub fn access_token(&self) -> Option<String> {
        self.writer.tokens.access_token()
    }

    pub fn current_user(&self) -> Option<User> {
        self.writer.tokens.user()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current_user().map_or(false, |u| u.has_role(role))
    }

    pub fn is_student(&self) -> bool {
        self.has_role(Role::Student.as_str())
    }

    pub fn is_creator(&self) -> bool {
        self.has_role(Role::Creator.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin.as_str())
    }

    /// "First Last", or empty when signed out.
    pub fn display_name(&self) -> String {
        self.current_user().map(|u| u.display_name()).unwrap_or_default()
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.writer.tokens.user_id()
    }

    pub fn current_user_role(&self) -> Option<String> {
        self.writer.tokens.user_role()
    }

    pub fn current_user_email(&self) -> Option<String> {
        self.writer.tokens.user_email()
    }

    pub fn token_expiration_date(&self) -> Option<DateTime<Utc>> {
        self.writer.tokens.expires_at()
    }

    pub fn session(&self) -> Session {
        self.writer.state.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.writer.state.subscribe()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.writer.navigator
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.writer.tokens
    }

    pub fn refresh_coordinator(&self) -> Arc<RefreshCoordinator> {
        self.refresh.clone()
    }
}
