use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use crate::error::{AppError, AuthError};

/// Performs the actual refresh exchange. Implemented by the auth client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges the stored refresh token and persists the new session.
    async fn refresh_access_token(&self) -> Result<String, AppError>;

    /// Ends the local session after a failed refresh.
    async fn force_logout(&self);
}

type PendingRefresh = Shared<BoxFuture<'static, Result<String, AuthError>>>;

/// Ensures at most one refresh exchange is in flight. Every caller that
/// arrives while one is pending awaits the same outcome.
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    pending: Mutex<Option<PendingRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            pending: Mutex::new(None),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().is_some()
    }

    /// Joins the pending refresh or starts one. A failed refresh forces a
    /// single logout no matter how many callers were waiting.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let pending = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let started = Self::start(self.refresher.clone());
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let outcome = pending.clone().await;

        let mut slot = self.lock();
        if slot.as_ref().map_or(false, |current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        outcome
    }

    fn start(refresher: Arc<dyn TokenRefresher>) -> PendingRefresh {
        async move {
            info!("Refreshing access token");
            match refresher.refresh_access_token().await {
                Ok(token) => {
                    info!("Access token refreshed");
                    Ok(token)
                }
                Err(e) => {
                    warn!("Token refresh failed: {}", e);
                    refresher.force_logout().await;
                    Err(AuthError::RefreshFailed(e.user_message()))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
