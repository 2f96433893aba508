//! Navigation module for the SkillUp client
//!
//! The core never drives the UI router itself. It publishes where the user
//! should go next and the host application follows.

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Sign in, then resume `return_url` if one was requested.
    Login { return_url: Option<String> },
    Unauthorized,
    Dashboard,
    /// Registration finished without a session; confirm the email first.
    CheckEmail,
    /// Back to the in-app route that sent the user to sign in.
    ReturnTo { url: String },
}

impl Navigation {
    pub fn login() -> Self {
        Navigation::Login { return_url: None }
    }

    pub fn login_returning_to(url: impl Into<String>) -> Self {
        Navigation::Login {
            return_url: Some(url.into()),
        }
    }

    /// Where to go after signing in. Only in-app paths are honoured, anything
    /// else falls back to the dashboard.
    pub fn after_login(return_url: Option<&str>) -> Self {
        match return_url.map(str::trim) {
            Some(url) if is_local_route(url) => Navigation::ReturnTo { url: url.to_string() },
            _ => Navigation::Dashboard,
        }
    }

    /// Router path including query parameters.
    pub fn route(&self) -> String {
        match self {
            Navigation::Login { return_url: Some(url) } => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("returnUrl", url)
                    .finish();
                format!("/login?{}", query)
            }
            Navigation::Login { return_url: None } => "/login".to_string(),
            Navigation::Unauthorized => "/unauthorized".to_string(),
            Navigation::Dashboard => "/dashboard".to_string(),
            Navigation::CheckEmail => "/login?message=registration-success".to_string(),
            Navigation::ReturnTo { url } => url.clone(),
        }
    }
}

fn is_local_route(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") && url != "/login"
}

/// Broadcast channel of navigation requests.
#[derive(Debug, Clone)]
pub struct Navigator {
    sender: broadcast::Sender<Navigation>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn navigate(&self, destination: Navigation) {
        debug!("Navigating to {}", destination.route());
        // No subscriber simply means no UI is attached.
        let _ = self.sender.send(destination);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Navigation> {
        self.sender.subscribe()
    }
}
