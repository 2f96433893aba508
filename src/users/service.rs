use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::validation::{self, ValidationErrors};
use crate::auth::{ApiResult, PasswordChange};
use crate::error::AppError;
use crate::http::{ApiClient, FilePart};
use crate::storage::StorageEvent;
use crate::users::models::{
    DeleteAccountRequest, UpdateUserProfileRequest, UserAchievement, UserProfile, UserStatistics,
};

const PICTURE_FIELD: &str = "file";

/// `/users/*` endpoints, all through the authenticated pipeline, plus a
/// cached copy of the last fetched profile.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
    profile: Arc<watch::Sender<Option<UserProfile>>>,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        let (profile, _) = watch::channel(None);
        Self {
            api,
            profile: Arc::new(profile),
        }
    }

    pub async fn get_profile(&self) -> Result<UserProfile, AppError> {
        let profile: UserProfile = self.api.get_json("/users/profile").await?;
        self.profile.send_replace(Some(profile.clone()));
        Ok(profile)
    }

    /// Re-fetches the cached profile when the backend accepts the update.
    pub async fn update_profile(&self, request: &UpdateUserProfileRequest) -> Result<ApiResult<bool>, AppError> {
        let result: ApiResult<bool> = self.api.put_json("/users/profile", request).await?;
        if result.success {
            if let Err(e) = self.get_profile().await {
                warn!("Profile updated but re-fetch failed: {}", e);
            }
        }
        Ok(result)
    }

    /// Sends the picture as the `file` form field and returns its URL.
    /// The cached profile is re-fetched when the upload succeeds.
    pub async fn upload_profile_picture(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Result<ApiResult<String>, AppError> {
        let mut errors = ValidationErrors::new();
        if file_name.trim().is_empty() {
            errors.add("file", "File name is required");
        }
        if bytes.is_empty() {
            errors.add("file", "File is empty");
        }
        errors.into_result()?;

        let mut file = FilePart::new(PICTURE_FIELD, file_name.trim(), bytes);
        if let Some(mime) = mime {
            file = file.with_mime(mime);
        }

        let result: ApiResult<String> = self.api.post_file("/users/profile-picture", file).await?;
        if result.success {
            info!("Profile picture uploaded");
            if let Err(e) = self.get_profile().await {
                warn!("Picture uploaded but profile re-fetch failed: {}", e);
            }
        }
        Ok(result)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<ApiResult<bool>, AppError> {
        validation::validate_password_change(change)?;
        self.api.post_json("/users/change-password", change).await
    }

    pub async fn statistics(&self) -> Result<UserStatistics, AppError> {
        self.api.get_json("/users/statistics").await
    }

    pub async fn achievements(&self) -> Result<Vec<UserAchievement>, AppError> {
        self.api.get_json("/users/achievements").await
    }

    pub async fn update_preferences<P: Serialize + ?Sized>(&self, preferences: &P) -> Result<ApiResult<bool>, AppError> {
        self.api.put_json("/users/preferences", preferences).await
    }

    pub async fn delete_account(&self, reason: &str, password: &str) -> Result<ApiResult<bool>, AppError> {
        let body = DeleteAccountRequest {
            reason: reason.to_string(),
            password: password.to_string(),
        };
        let result: ApiResult<bool> = self.api.delete_json("/users/account", Some(&body)).await?;
        if result.success {
            info!("Account deleted");
            self.clear_profile();
        }
        Ok(result)
    }

    pub fn clear_profile(&self) {
        self.profile.send_replace(None);
    }

    pub fn current_profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    pub fn subscribe_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile.subscribe()
    }

    /// Drops the cached profile when another client sharing storage logged out.
    pub fn handle_storage_event(&self, event: &StorageEvent) {
        if event.signals_logout() {
            debug!("Logout detected elsewhere, clearing cached profile");
            self.clear_profile();
        }
    }

    /// Handles events on a background task. Returns `None` outside a tokio
    /// runtime, in which case the receiver is dropped.
    pub fn watch_storage_events(&self, mut events: broadcast::Receiver<StorageEvent>) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            debug!("No runtime, storage events are handled inline");
            return None;
        };
        let service = self.clone();
        Some(handle.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => service.handle_storage_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} storage events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    #[cfg(test)]
    pub(crate) fn cache(&self, profile: UserProfile) {
        self.profile.send_replace(Some(profile));
    }
}
