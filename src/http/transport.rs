use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::http::{logging, normalize};

/// A file sent as a single multipart form field. Kept as raw bytes so the
/// form can be rebuilt for a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn form(&self) -> Result<Form, AppError> {
        let mut part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| AppError::ClientError(format!("Invalid content type {}: {}", mime, e)))?;
        }
        Ok(Form::new().part(self.field.clone(), part))
    }

    /// What the logs show instead of the file contents.
    fn summary(&self) -> Value {
        json!({ "file": self.file_name, "bytes": self.bytes.len() })
    }
}

/// One backend call. The body is serialized up front so the request can be
/// replayed verbatim after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub file: Option<FilePart>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            file: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, AppError> {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, AppError> {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// A multipart POST carrying one file. Replaces any JSON body.
    pub fn upload(path: impl Into<String>, file: FilePart) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.file = Some(file);
        request
    }

    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, AppError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let body = self.body.unwrap_or(Value::Null);
        serde_json::from_value(body)
            .map_err(|e| AppError::ClientError(format!("Failed to decode response: {}", e)))
    }
}

/// Sends requests to the backend, logging each exchange and normalizing
/// every failure into an [`AppError`] with a single user-facing message.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    log_bodies: bool,
}

impl HttpTransport {
    pub fn new(base_url: &str, log_bodies: bool) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url,
            log_bodies,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> Result<Url, AppError> {
        let url = format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'));
        Ok(Url::parse(&url)?)
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, AppError> {
        let id = Uuid::new_v4();
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(file) = &request.file {
            builder = builder.multipart(file.form()?);
        } else if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }
        let outgoing = builder
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        let summary = request.file.as_ref().map(FilePart::summary);
        logging::log_request(id, &outgoing, summary.as_ref().or(request.body.as_ref()), self.log_bodies);

        let response = match self.client.execute(outgoing).await {
            Ok(response) => response,
            Err(e) => {
                let err = AppError::from(e);
                logging::log_failure(id, &url, None, &err.user_message());
                return Err(err);
            }
        };

        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);
        logging::log_response(id, &url, status, body.as_ref(), self.log_bodies);

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            let err = normalize::api_error(status, body);
            logging::log_failure(id, &url, Some(status), &err.message);
            Err(AppError::ApiError(err))
        }
    }
}

/// JSON when it parses, the raw text as a JSON string otherwise.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
