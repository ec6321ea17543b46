//! Blocking reqwest transport.

use super::{FetchError, HttpFetcher};
use std::time::Duration;

/// HTTP fetcher backed by a blocking reqwest client.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher sending `user_agent` and giving up after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Sends a GET request and checks the response status.
    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        tracing::debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.send(url)?.text().map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.send(url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connection {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else if error.is_body() || error.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        FetchError::Other(error.to_string())
    }
}
