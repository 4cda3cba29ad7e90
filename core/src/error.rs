//! Error types for the remote API client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("status code: {status}, message: {message}")]
    Status { status: u16, message: String },

    #[error("token not found in login response")]
    MissingToken,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build a status error from a response body, picking up the API's
    /// `{"message": "..."}` payload when there is one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_default();
        ApiError::Status { status, message }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
