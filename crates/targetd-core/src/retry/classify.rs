//! Classify discovery failures into transient or permanent.

use crate::discovery::{DiscoveryError, ErrorCategory};
use crate::retry::policy::ErrorClass;

/// Retry class for an error category.
///
/// Unknown failures are treated as transient: an outage should not be
/// mistaken for a configuration problem.
pub fn classify_category(category: ErrorCategory) -> ErrorClass {
    match category {
        ErrorCategory::Timeout
        | ErrorCategory::Connection
        | ErrorCategory::Dns
        | ErrorCategory::Server
        | ErrorCategory::Throttled
        | ErrorCategory::Cancelled
        | ErrorCategory::Unknown => ErrorClass::Transient,
        ErrorCategory::Unauthenticated
        | ErrorCategory::Forbidden
        | ErrorCategory::Malformed
        | ErrorCategory::InvalidInput => ErrorClass::Permanent,
    }
}

/// Classify a discovery error for retry decisions.
pub fn classify(e: &DiscoveryError) -> ErrorClass {
    classify_category(e.category)
}

/// Map an HTTP status from a discovery backend to an error category.
pub fn category_for_http_status(code: u16) -> ErrorCategory {
    match code {
        401 => ErrorCategory::Unauthenticated,
        403 => ErrorCategory::Forbidden,
        400 | 404 | 422 => ErrorCategory::InvalidInput,
        408 | 504 => ErrorCategory::Timeout,
        429 => ErrorCategory::Throttled,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_failures_are_transient() {
        for c in [
            ErrorCategory::Timeout,
            ErrorCategory::Connection,
            ErrorCategory::Dns,
            ErrorCategory::Server,
            ErrorCategory::Throttled,
        ] {
            assert_eq!(classify_category(c), ErrorClass::Transient, "{}", c);
        }
    }

    #[test]
    fn auth_and_parse_failures_are_permanent() {
        for c in [
            ErrorCategory::Unauthenticated,
            ErrorCategory::Forbidden,
            ErrorCategory::Malformed,
            ErrorCategory::InvalidInput,
        ] {
            assert_eq!(classify_category(c), ErrorClass::Permanent, "{}", c);
        }
    }

    #[test]
    fn unknown_defaults_to_transient() {
        let e = DiscoveryError::new(ErrorCategory::Unknown, "permission denied (looks permanent)");
        assert_eq!(classify(&e), ErrorClass::Transient);
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(category_for_http_status(401), ErrorCategory::Unauthenticated);
        assert_eq!(category_for_http_status(403), ErrorCategory::Forbidden);
        assert_eq!(category_for_http_status(422), ErrorCategory::InvalidInput);
        assert_eq!(category_for_http_status(429), ErrorCategory::Throttled);
        assert_eq!(category_for_http_status(502), ErrorCategory::Server);
        assert_eq!(category_for_http_status(504), ErrorCategory::Timeout);
        assert_eq!(category_for_http_status(302), ErrorCategory::Unknown);
    }
}
