use thiserror::Error;

/// Shown whenever a request never produced a usable response.
pub const CONNECT_FAILURE_MESSAGE: &str = "Failed to connect to the server.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("server rejected request with status {status}: {message}")]
    RemoteRejection { status: u16, message: String },
    #[error("server rejected request with status {status}")]
    RemoteRejectionUnstructured { status: u16 },
    #[error("request failed before a response was decoded: {0}")]
    Transport(String),
}

impl RequestError {
    /// Text for the operator; `fallback` covers rejections without a message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::RemoteRejection { message, .. } => message.clone(),
            Self::RemoteRejectionUnstructured { .. } => fallback.to_string(),
            Self::Transport(_) => CONNECT_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRejection { status, .. } | Self::RemoteRejectionUnstructured { status } => {
                Some(*status)
            }
            Self::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<shared::error::DecodeError> for RequestError {
    fn from(value: shared::error::DecodeError) -> Self {
        Self::Transport(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiSetupError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
