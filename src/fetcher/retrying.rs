//! Retry wrapper for any fetcher.

use super::{FetchError, HttpFetcher};
use crate::retry::{RetryDecision, RetryPolicy, classify};
use std::time::Duration;

/// A fetcher that retries transient failures of the wrapped fetcher.
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
    sleep: fn(Duration),
}

impl<F: HttpFetcher> RetryingFetcher<F> {
    /// Wraps `inner`, retrying according to `policy`.
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleep: std::thread::sleep,
        }
    }

    /// Replaces the function used to wait between attempts.
    pub fn with_sleeper(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    fn run<T>(
        &self,
        url: &str,
        mut op: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => match self.policy.decide(attempt, classify(&e)) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying request"
                        );
                        (self.sleep)(delay);
                        attempt += 1;
                    }
                },
            }
        }
    }
}

impl<F: HttpFetcher> HttpFetcher for RetryingFetcher<F> {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.run(url, || self.inner.get_text(url))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.run(url, || self.inner.get_bytes(url))
    }
}
