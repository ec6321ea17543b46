//! HTTP retrieval for catalog listings, player configs and thumbnails.
//!
//! All network access goes through the [`HttpFetcher`] trait so that the
//! parsers and resolvers can be exercised without a network, and so that a
//! plugin host can hand in its own transport.
mod reqwest_client;
mod retrying;

pub use reqwest_client::ReqwestFetcher;
pub use retrying::RetryingFetcher;

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request timed out
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The connection could not be established or was reset
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body could not be read
    #[error("Failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// Any other transport failure
    #[error("Request failed: {0}")]
    Other(String),
}

impl FetchError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Blocking HTTP transport.
pub trait HttpFetcher {
    /// Fetches `url` and returns the body decoded as UTF-8 text.
    fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetches `url` and returns the raw body.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: HttpFetcher + ?Sized> HttpFetcher for Arc<T> {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        (**self).get_text(url)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get_bytes(url)
    }
}

/// Fetcher handle shared between the catalog, the resolver and the thumbnail cache.
pub type SharedFetcher = Arc<dyn HttpFetcher + Send + Sync>;

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory fetcher used by the unit tests.

    use super::{FetchError, HttpFetcher};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Answers requests from a table of canned responses.
    ///
    /// Each URL holds a queue; the last queued response is repeated once the
    /// queue has drained down to one entry. Unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        responses: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, FetchError>>>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_text(self, url: &str, body: &str) -> Self {
            self.push(url, Ok(body.as_bytes().to_vec()));
            self
        }

        pub(crate) fn with_bytes(self, url: &str, body: &[u8]) -> Self {
            self.push(url, Ok(body.to_vec()));
            self
        }

        pub(crate) fn with_error(self, url: &str, error: FetchError) -> Self {
            self.push(url, Err(error));
            self
        }

        fn push(&self, url: &str, response: Result<Vec<u8>, FetchError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(response);
        }

        /// Number of requests made for `url`.
        pub(crate) fn request_count(&self, url: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.as_str() == url)
                .count()
        }

        /// Total number of requests made.
        pub(crate) fn total_requests(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn respond(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) if queue.len() == 1 => queue[0].clone(),
                _ => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    impl HttpFetcher for FakeFetcher {
        fn get_text(&self, url: &str) -> Result<String, FetchError> {
            let bytes = self.respond(url)?;
            String::from_utf8(bytes).map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }

        fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.respond(url)
        }
    }
}
