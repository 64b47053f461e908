use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::ResponseBody;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response. `body` keeps the parsed payload for field-level errors.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        body: ResponseBody,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Maximum length for text error bodies carried into log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Build the error for a non-success status, preferring the body's
    /// `message` over the status reason phrase.
    pub fn from_status(status: StatusCode, body: ResponseBody) -> Self {
        let message = body
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown Status").to_string());
        ApiError::Status {
            status,
            message,
            body,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// First validation message per field from an `{"errors": {field: [msg, ...]}}` body.
    ///
    /// A bare string instead of an array is accepted too.
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        let Some(errors) = self
            .body()
            .and_then(ResponseBody::as_json)
            .and_then(|v| v.get("errors"))
            .and_then(Value::as_object)
        else {
            return BTreeMap::new();
        };

        errors
            .iter()
            .filter_map(|(field, messages)| {
                let first = match messages {
                    Value::Array(items) => items.first().and_then(Value::as_str),
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                }?;
                Some((field.clone(), first.to_string()))
            })
            .collect()
    }

    /// Short description of the body for logs.
    pub fn body_excerpt(&self) -> Option<String> {
        let body = self.body()?;
        let text = match body {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        };
        Some(truncate_body(&text))
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
