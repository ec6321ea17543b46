use std::time::Duration;

/// Why an Arte API request failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request did not complete within the client timeout.
    Timeout,
    /// Rate limited by the CDN or API (429, 503).
    Throttled,
    /// Connection refused, reset, or the host did not resolve.
    Connection,
    /// Other 5xx answer from the API.
    Http5xx(u16),
    /// Client errors and malformed responses. Never retried.
    Other,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff for catalog and player requests.
///
/// The n-th retry waits `base_delay * 2^(n-1)`, never more than `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, the first request included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decides whether attempt number `attempt` (1-based) should be followed by another.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => RetryDecision::RetryAfter(self.backoff(attempt)),
        }
    }

    /// Delay before the retry that follows attempt `attempt`.
    fn backoff(&self, attempt: u32) -> Duration {
        match 2u32.checked_pow(attempt.saturating_sub(1)) {
            Some(factor) => self.base_delay.saturating_mul(factor).min(self.max_delay),
            None => self.max_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(decision: RetryDecision) -> Duration {
        match decision {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry"),
        }
    }

    #[test]
    fn test_no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let p = RetryPolicy {
            max_attempts: 20,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(delay(p.decide(1, ErrorKind::Timeout)), Duration::from_millis(100));
        assert_eq!(delay(p.decide(2, ErrorKind::Timeout)), Duration::from_millis(200));
        assert_eq!(delay(p.decide(3, ErrorKind::Connection)), Duration::from_millis(400));
        assert_eq!(delay(p.decide(12, ErrorKind::Throttled)), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_keeps_doubling_up_to_a_large_cap() {
        let p = RetryPolicy {
            max_attempts: 64,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(delay(p.decide(10, ErrorKind::Timeout)), Duration::from_millis(5120));
        assert_eq!(delay(p.decide(11, ErrorKind::Timeout)), Duration::from_secs(10));
        assert_eq!(delay(p.decide(40, ErrorKind::Timeout)), Duration::from_secs(10));
    }

    #[test]
    fn test_respects_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(matches!(p.decide(1, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, ErrorKind::Http5xx(502)), RetryDecision::NoRetry);
    }

    #[test]
    fn test_no_retry_policy_gives_up_immediately() {
        let p = RetryPolicy::no_retry();
        assert_eq!(p.decide(1, ErrorKind::Timeout), RetryDecision::NoRetry);
    }
}
