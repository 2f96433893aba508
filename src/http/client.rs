use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::http::refresh::RefreshCoordinator;
use crate::http::transport::{ApiRequest, ApiResponse, FilePart, HttpTransport};
use crate::storage::TokenStore;

/// Authenticated request pipeline for everything outside `/Auth/*`.
///
/// Attaches the stored bearer token and recovers from a 401 by refreshing
/// once and replaying the request once.
#[derive(Clone)]
pub struct ApiClient {
    transport: HttpTransport,
    tokens: TokenStore,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(transport: HttpTransport, tokens: TokenStore, refresh: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            tokens,
            refresh,
        }
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        let sent_with = self.tokens.access_token();
        let attempt = request.clone().with_bearer(sent_with.clone());

        match self.transport.execute(&attempt).await {
            Err(err) if err.is_unauthorized() => self.recover(request, sent_with, err).await,
            outcome => outcome,
        }
    }

    async fn recover(
        &self,
        request: ApiRequest,
        sent_with: Option<String>,
        original: AppError,
    ) -> Result<ApiResponse, AppError> {
        let token = match self.tokens.access_token() {
            // Another caller already refreshed while this request was in flight.
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => {
                debug!("Retrying {} {} with the current token", request.method, request.path);
                current
            }
            None if sent_with.is_some() => {
                debug!("Session ended while {} {} was in flight", request.method, request.path);
                return Err(original);
            }
            _ => match self.refresh.refresh().await {
                Ok(token) => token,
                Err(e) => {
                    warn!("Giving up on {} {}: {}", request.method, request.path, e);
                    return Err(original);
                }
            },
        };

        self.transport.execute(&request.with_bearer(Some(token))).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path, body)?).await?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path, body)?).await?.json()
    }

    pub async fn post_file<T: DeserializeOwned>(&self, path: &str, file: FilePart) -> Result<T, AppError> {
        self.send(ApiRequest::upload(path, file)).await?.json()
    }

    pub async fn delete_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = ApiRequest::delete(path);
        if let Some(body) = body {
            request = request.with_body(body)?;
        }
        self.send(request).await?.json()
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}
