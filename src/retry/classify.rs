//! Map fetch failures onto retry error kinds.

use super::policy::ErrorKind;
use crate::fetcher::FetchError;

/// Classify an HTTP status code for retry decisions.
pub(crate) fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Classify a fetch error into an ErrorKind.
pub(crate) fn classify(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::Timeout { .. } => ErrorKind::Timeout,
        FetchError::Connection { .. } => ErrorKind::Connection,
        FetchError::Status { status, .. } => classify_http_status(*status),
        FetchError::Body { .. } | FetchError::Other(_) => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn test_http_5xx_retryable() {
        assert_eq!(classify_http_status(500), ErrorKind::Http5xx(500));
        assert_eq!(classify_http_status(502), ErrorKind::Http5xx(502));
    }

    #[test]
    fn test_http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
    }

    #[test]
    fn test_classify_fetch_errors() {
        let timeout = FetchError::Timeout {
            url: "https://example.org".to_string(),
        };
        assert_eq!(classify(&timeout), ErrorKind::Timeout);

        let body = FetchError::Body {
            url: "https://example.org".to_string(),
            reason: "truncated".to_string(),
        };
        assert_eq!(classify(&body), ErrorKind::Other);

        let status = FetchError::Status {
            url: "https://example.org".to_string(),
            status: 504,
        };
        assert_eq!(classify(&status), ErrorKind::Http5xx(504));
    }
}
