//! Error types for the verification client.

use thiserror::Error;

/// Errors from a single verification call. None of these are retried
/// automatically; the row state machine leaves the action re-triggerable.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The endpoint answered with a non-success status. The message comes
    /// from the response body's `error` field when present.
    #[error("verification endpoint error: {message}")]
    Endpoint {
        message: String,
        http_status: Option<u16>,
    },

    /// The endpoint answered 2xx but the body was not the expected shape.
    #[error("invalid verification response: {0}")]
    InvalidResponse(String),

    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (bad base URL, client build failure).
    #[error("configuration error: {0}")]
    Config(String),
}

impl VerifyError {
    pub fn endpoint(message: impl Into<String>, http_status: Option<u16>) -> Self {
        Self::Endpoint {
            message: message.into(),
            http_status,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Row-facing failure text: the endpoint's own message when it sent one,
    /// otherwise a generic transport reason.
    pub fn reason(&self) -> String {
        match self {
            Self::Endpoint { message, .. } if !message.is_empty() => message.clone(),
            _ => "Verify failed".to_string(),
        }
    }
}
