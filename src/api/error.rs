use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable API base URL configured.
    #[error("Missing {0}")]
    Configuration(String),
    /// Non-success HTTP status. `message` is the response body, or a generic
    /// message when the body was empty.
    #[error("{message}")]
    Request { status: u16, message: String },
    /// Success status with a body that is not valid JSON for the expected shape.
    #[error("Failed to parse API response: {0}")]
    Parse(String),
    /// The request never produced a response (connection refused, reset, ...).
    #[error("Request failed: {0}")]
    Transport(String),
}

impl ApiError {
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        let message = if body.is_empty() {
            format!("Request failed: {}", status)
        } else {
            body
        };
        ApiError::Request { status, message }
    }

    /// HTTP status for `Request` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
