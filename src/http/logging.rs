//! Request/response logging stage. Observes only; never edits what it sees.

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Request, StatusCode};
use serde_json::Value;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

const REDACTED: &str = "<redacted>";

/// Header map rendered for logs, with the bearer credential hidden.
pub fn loggable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == AUTHORIZATION {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

fn render_body(body: Option<&Value>, log_bodies: bool) -> String {
    match body {
        Some(_) if !log_bodies => "<omitted>".to_string(),
        Some(value) => value.to_string(),
        None => "<empty>".to_string(),
    }
}

pub fn log_request(id: Uuid, request: &Request, body: Option<&Value>, log_bodies: bool) {
    info!(
        request_id = %id,
        method = %request.method(),
        url = %request.url(),
        headers = ?loggable_headers(request.headers()),
        body = %render_body(body, log_bodies),
        "Outgoing request"
    );
}

pub fn log_response(id: Uuid, url: &Url, status: StatusCode, body: Option<&Value>, log_bodies: bool) {
    info!(
        request_id = %id,
        status = status.as_u16(),
        status_text = status.canonical_reason().unwrap_or(""),
        url = %url,
        body = %render_body(body, log_bodies),
        "Incoming response"
    );
}

pub fn log_failure(id: Uuid, url: &Url, status: Option<StatusCode>, message: &str) {
    error!(
        request_id = %id,
        status = ?status.map(|s| s.as_u16()),
        url = %url,
        message = message,
        "HTTP error"
    );
}
