use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ApiError;

/// Pulls a readable message out of a backend error body: a plain string
/// body, then `message`, then `title`, then `errors` (array or field map).
pub fn extract_server_message(body: Option<&Value>) -> Option<String> {
    let message = match body? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Object(fields) => non_empty_str(fields.get("message"))
            .or_else(|| non_empty_str(fields.get("title")))
            .or_else(|| fields.get("errors").and_then(join_errors)),
        _ => None,
    };
    message.filter(|m| !m.is_empty())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn join_errors(errors: &Value) -> Option<String> {
    let mut messages = Vec::new();
    match errors {
        Value::Array(items) => items.iter().for_each(|item| push_message(&mut messages, item)),
        // ASP.NET-style `{ "Field": ["msg", ...] }` maps are flattened.
        Value::Object(fields) => fields.values().for_each(|value| match value {
            Value::Array(items) => items.iter().for_each(|item| push_message(&mut messages, item)),
            other => push_message(&mut messages, other),
        }),
        other => push_message(&mut messages, other),
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join(", "))
    }
}

fn push_message(messages: &mut Vec<String>, value: &Value) {
    match value {
        Value::String(text) if !text.trim().is_empty() => messages.push(text.clone()),
        Value::String(_) | Value::Null => {}
        other => messages.push(other.to_string()),
    }
}

/// The single user-facing message for a failed response.
pub fn message_for(status: StatusCode, body: Option<&Value>) -> String {
    let server = || extract_server_message(body);
    match status.as_u16() {
        400 => server().unwrap_or_else(|| "Bad Request".to_string()),
        401 => "Unauthorized - Please login".to_string(),
        403 => "Forbidden - Access denied".to_string(),
        404 => "Resource not found".to_string(),
        409 => server().unwrap_or_else(|| "Conflict - Resource already exists".to_string()),
        422 => server().unwrap_or_else(|| "Validation error".to_string()),
        500 => "Internal Server Error".to_string(),
        code => server().unwrap_or_else(|| {
            format!(
                "Server Error: {} - {}",
                code,
                status.canonical_reason().unwrap_or("Unknown error")
            )
        }),
    }
}

pub fn api_error(status: StatusCode, body: Option<Value>) -> ApiError {
    ApiError {
        status: status.as_u16(),
        message: message_for(status, body.as_ref()),
        body,
    }
}
