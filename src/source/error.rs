//! Error types for fetchers.

use thiserror::Error;

/// Errors that can occur during one fetch.
///
/// All variants are transient from the live core's point of view: the
/// scheduler logs them and retries on the next tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status code.
    #[error("server returned status {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Local read failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Timeout waiting for response.
    #[error("request timed out")]
    Timeout,

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Remote procedure returned an error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            FetchError::Timeout
        } else {
            FetchError::Io(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_parse_errors() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Parse(_)));
    }

    #[test]
    fn io_errors_keep_their_message() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(FetchError::from(err), FetchError::Io("gone".into()));

        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(FetchError::from(err), FetchError::Timeout);
    }

    #[test]
    fn display_messages() {
        assert_eq!(FetchError::Status(502).to_string(), "server returned status 502");
        let rpc = FetchError::Rpc {
            code: -32601,
            message: "method not found".into(),
        };
        assert_eq!(rpc.to_string(), "RPC error -32601: method not found");
    }
}
