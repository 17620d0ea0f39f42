//! Discovery failure type carried into retry classification.

use std::fmt;

/// What went wrong while fetching targets, independent of the backend.
///
/// Backends map their native failures (HTTP status, IO errors, API client
/// errors) into one of these categories; retry decisions are keyed on the
/// category, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The call did not finish before its deadline.
    Timeout,
    /// Connection refused/reset or backend not reachable.
    Connection,
    /// Name resolution failed.
    Dns,
    /// Backend answered with a 5xx-class error.
    Server,
    /// Backend asked us to slow down (429).
    Throttled,
    /// Credentials missing or rejected (401).
    Unauthenticated,
    /// Credentials valid but not allowed (403).
    Forbidden,
    /// Source data could not be parsed.
    Malformed,
    /// The request itself was invalid (400, 404, 422).
    InvalidInput,
    /// The call was interrupted by shutdown.
    Cancelled,
    /// Anything the backend could not place.
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Dns => "dns",
            ErrorCategory::Server => "server",
            ErrorCategory::Throttled => "throttled",
            ErrorCategory::Unauthenticated => "unauthenticated",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::Malformed => "malformed",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a discovery source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct DiscoveryError {
    pub category: ErrorCategory,
    pub message: String,
}

impl DiscoveryError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Deadline of `after` expired before the source answered.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            ErrorCategory::Timeout,
            format!("discovery did not answer within {:?}", after),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCategory::Cancelled, "refresh cancelled by shutdown")
    }

    /// Build an error from an HTTP status returned by a discovery backend.
    pub fn from_http_status(code: u16, message: impl Into<String>) -> Self {
        Self::new(crate::retry::category_for_http_status(code), message)
    }
}

impl From<std::io::Error> for DiscoveryError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;
        let category = match e.kind() {
            Io::TimedOut | Io::WouldBlock => ErrorCategory::Timeout,
            Io::NotFound
            | Io::ConnectionRefused
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::NotConnected
            | Io::BrokenPipe
            | Io::UnexpectedEof
            | Io::Interrupted => ErrorCategory::Connection,
            Io::PermissionDenied => ErrorCategory::Forbidden,
            Io::InvalidData => ErrorCategory::Malformed,
            Io::InvalidInput => ErrorCategory::InvalidInput,
            _ => ErrorCategory::Unknown,
        };
        Self::new(category, e.to_string())
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(e: serde_json::Error) -> Self {
        let category = if e.is_io() {
            ErrorCategory::Connection
        } else {
            ErrorCategory::Malformed
        };
        Self::new(category, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_connection() {
        let e: DiscoveryError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.category, ErrorCategory::Connection);
    }

    #[test]
    fn json_syntax_error_is_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let e: DiscoveryError = err.into();
        assert_eq!(e.category, ErrorCategory::Malformed);
    }

    #[test]
    fn http_status_maps_to_category() {
        let e = DiscoveryError::from_http_status(503, "api server unavailable");
        assert_eq!(e.category, ErrorCategory::Server);
        assert_eq!(e.message, "api server unavailable");
        assert_eq!(
            DiscoveryError::from_http_status(401, "token expired").category,
            ErrorCategory::Unauthenticated
        );
        assert_eq!(
            DiscoveryError::from_http_status(429, "slow down").category,
            ErrorCategory::Throttled
        );
    }

    #[test]
    fn display_includes_category_and_message() {
        let e = DiscoveryError::new(ErrorCategory::Dns, "no such host");
        assert_eq!(e.to_string(), "dns: no such host");
    }
}
