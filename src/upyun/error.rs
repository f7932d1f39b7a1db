//! Error taxonomy for UpYun requests

use hyper::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// UpYun client errors
#[derive(Error, Debug)]
pub enum UpYunError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("UpYun error: {status} - {message}")]
    Status { status: StatusCode, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    Protocol(String),

    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(Method),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No tokio runtime available to drive requests")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, UpYunError>;

impl UpYunError {
    /// Numeric error code paired with the display message.
    ///
    /// Replies carry their HTTP status; local failures use codes below 100
    /// so the two ranges never overlap.
    pub fn code(&self) -> u16 {
        match self {
            UpYunError::Status { status, .. } => status.as_u16(),
            UpYunError::Transport(_) => 1,
            UpYunError::Timeout(_) => 2,
            UpYunError::Protocol(_) => 3,
            UpYunError::InvalidMethod(_) => 4,
            UpYunError::Http(_) => 5,
            UpYunError::Io(_) => 6,
            UpYunError::NoRuntime => 7,
        }
    }

    /// Build a `Status` error from a non-2xx reply
    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        } else {
            String::from_utf8_lossy(body).trim().to_string()
        };
        UpYunError::Status { status, message }
    }
}

impl From<hyper_util::client::legacy::Error> for UpYunError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        UpYunError::Transport(format!("Client error: {}", err))
    }
}

impl From<hyper::Error> for UpYunError {
    fn from(err: hyper::Error) -> Self {
        UpYunError::Transport(format!("Body error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_uses_body() {
        let err = UpYunError::from_status(StatusCode::UNAUTHORIZED, b"sign error\n");
        assert_eq!(err.code(), 401);
        assert_eq!(err.to_string(), "UpYun error: 401 Unauthorized - sign error");
    }

    #[test]
    fn test_status_message_falls_back_to_reason() {
        let err = UpYunError::from_status(StatusCode::NOT_FOUND, b"");
        match err {
            UpYunError::Status { message, .. } => assert_eq!(message, "Not Found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_local_codes_are_distinct() {
        let codes = [
            UpYunError::Transport(String::new()).code(),
            UpYunError::Timeout(Duration::from_secs(1)).code(),
            UpYunError::Protocol(String::new()).code(),
            UpYunError::InvalidMethod(Method::POST).code(),
            UpYunError::NoRuntime.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a < 100);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
