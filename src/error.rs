//! Clubsync Error Types

use thiserror::Error;

/// Result type alias for clubsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Clubsync error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Transport errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Server error: {status} {reason}")]
    Server { status: u16, reason: String },

    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an error from a non-2xx HTTP status.
    ///
    /// 404 maps to `NotFound` so callers can distinguish a missing resource
    /// from other server failures; everything else keeps its status code.
    pub fn from_status(status: u16, reason: &str, path: &str) -> Self {
        if status == 404 {
            Error::NotFound(format!("{path} ({status} {reason})"))
        } else {
            Error::Server {
                status,
                reason: format!("{reason} ({path})"),
            }
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_404_to_not_found() {
        let err = Error::from_status(404, "Not Found", "/api/members/abc");
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_from_status_keeps_other_codes() {
        let err = Error::from_status(500, "Internal Server Error", "/api/members");
        match err {
            Error::Server { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other}"),
        }
    }
}
