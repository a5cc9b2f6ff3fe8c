//! Transport error types

use thiserror::Error;

/// Errors that can occur when talking to the TSDS web service
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("TSDS unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("TSDS error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl TransportError {
    /// Classify a reqwest error the way callers care about
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unavailable
        } else {
            Self::Request(e)
        }
    }
}
