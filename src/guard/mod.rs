//! Route guard for the SkillUp client
//!
//! Decides whether a protected route may be entered and where to send the
//! user when it may not.

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::auth::AuthClient;
use crate::navigation::Navigation;

/// Static data attached to a protected route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteData {
    pub path: String,
    pub required_role: Option<String>,
}

impl RouteData {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required_role: None,
        }
    }

    pub fn requiring_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Navigation),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    auth: AuthClient,
}

impl RouteGuard {
    pub fn new(auth: AuthClient) -> Self {
        Self { auth }
    }

    /// Redirects are also published on the navigator. An allowed route kicks
    /// off a background expiry check without waiting for it.
    pub fn can_activate(&self, route: &RouteData, requested_url: &str) -> GuardDecision {
        if !self.auth.is_authenticated() {
            info!("Unauthenticated access to {}, redirecting to login", route.path);
            return self.redirect(Navigation::login_returning_to(requested_url));
        }

        if let Some(role) = route.required_role.as_deref() {
            if !self.auth.has_role(role) {
                info!("Route {} requires role {}", route.path, role);
                return self.redirect(Navigation::Unauthorized);
            }
        }

        match Handle::try_current() {
            Ok(handle) => {
                let auth = self.auth.clone();
                handle.spawn(async move {
                    let outcome = auth.check_token_expiration().await;
                    debug!("Background token check: {:?}", outcome);
                });
            }
            Err(_) => debug!("No runtime, skipping background token check"),
        }

        GuardDecision::Allow
    }

    fn redirect(&self, destination: Navigation) -> GuardDecision {
        self.auth.navigator().navigate(destination.clone());
        GuardDecision::Redirect(destination)
    }
}
