use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body returned by the backend alongside a non-success status.
///
/// `error` is kept as a raw value: only a string counts as a usable message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: Option<Value>,
}

impl ErrorPayload {
    pub fn from_value(body: &Value) -> Self {
        Self {
            error: body.get("error").cloned(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}
