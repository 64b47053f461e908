use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// A response body, parsed as JSON when the server said it was JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Parse raw body text according to the response's `content-type`.
    ///
    /// An empty JSON body becomes `null`; a JSON body that fails to parse is
    /// kept as text so the caller can still see what came back.
    pub fn parse(content_type: Option<&str>, text: String) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return ResponseBody::Text(text);
        }
        if text.trim().is_empty() {
            return ResponseBody::Json(Value::Null);
        }
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            // Mislabelled bodies are not an error here. Error responses keep
            // their text, and `into_typed` rejects it where a type was expected.
            Err(_) => ResponseBody::Text(text),
        }
    }

    /// The `message` field of a JSON object body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(value) => value.get("message").and_then(Value::as_str),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Deserialize into `T`. Text bodies are offered as a JSON string, so
    /// `String` works for plain-text endpoints.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        };
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}
