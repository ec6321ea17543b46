//! Retry and backoff policy.
//!
//! Every catalog and player request goes through this policy so that
//! transient failures (timeouts, throttling, connection resets, 5xx) are
//! retried with exponential backoff while permanent ones surface immediately.

mod classify;
mod policy;

pub(crate) use classify::{classify, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
