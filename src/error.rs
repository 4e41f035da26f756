//! Error types for pybridge

use thiserror::Error;

/// Result type alias using pybridge's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pybridge
///
/// Protocol, quota and engine errors are request-local: the server converts
/// them into a failure response and keeps reading. Only stream-level I/O
/// failures end the read loop.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed wire data or an oversized request line
    #[error("protocol error: {0}")]
    Protocol(String),

    /// File count/size quota violation, empty path, or invalid path segment
    #[error("quota error: {0}")]
    Quota(String),

    /// Failure raised while running submitted code inside the guest
    #[error("execution error: {0}")]
    Execution(String),

    /// Failure of the guest engine itself (package load, filesystem write,
    /// payload serialization)
    #[error("engine error: {0}")]
    Engine(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error on the request/response streams
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the error is local to a single request/response exchange
    ///
    /// Request-local errors become failure responses; anything else
    /// propagates out of the read loop.
    pub fn is_request_local(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::Quota(_) | Error::Execution(_) | Error::Engine(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_local_classification() {
        assert!(Error::Protocol("bad line".to_string()).is_request_local());
        assert!(Error::Quota("too many files".to_string()).is_request_local());
        assert!(Error::Engine("load failed".to_string()).is_request_local());
        assert!(!Error::Io(std::io::Error::other("stream gone")).is_request_local());
        assert!(!Error::Config("missing root".to_string()).is_request_local());
    }

    #[test]
    fn test_display_prefixes() {
        let err = Error::Quota("file too large".to_string());
        assert_eq!(err.to_string(), "quota error: file too large");
    }
}
