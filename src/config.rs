//! Resolver configuration
//!
//! Settings live in `config.toml` in the platform configuration directory.
//! A default file is written on first use; missing keys fall back to
//! defaults so older files keep working.

use crate::catalog::Language;
use crate::retry::RetryPolicy;
use crate::stream::{StreamPreferences, StreamProtocol, VideoQuality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine configuration directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the configuration file
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the default configuration file
    #[error("Failed to write configuration file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("Failed to parse configuration file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to serialize the configuration
    #[error("Failed to serialize configuration: {0}")]
    SerializationFailed(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Retry parameters for HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first)
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Configuration of the catalog resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Catalog and player language
    pub language: Language,
    /// Preferred stream quality
    pub quality: VideoQuality,
    /// Preferred stream protocol
    pub protocol: StreamProtocol,
    /// Viewer country (ISO 3166 alpha-2) used to hide geoblocked videos
    pub country: Option<String>,
    /// Videos per listing page
    pub page_limit: u32,
    /// Maximum number of listing pages followed when browsing everything
    pub max_pages: u32,
    /// How long listing pages stay cached, in seconds
    pub catalog_ttl_secs: u64,
    /// How long resolved streams stay cached, in seconds
    pub stream_ttl_secs: u64,
    /// Per-request timeout, in seconds
    pub request_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Base URL of the listing API
    pub api_base: String,
    /// Base URL of the player API
    pub player_base: String,
    /// Keep listings and thumbnails on disk between runs
    pub disk_cache: bool,
    pub retry: RetryConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            language: Language::French,
            quality: VideoQuality::VeryHigh,
            protocol: StreamProtocol::Http,
            country: None,
            page_limit: 50,
            max_pages: 10,
            catalog_ttl_secs: 60 * 60,
            stream_ttl_secs: 5 * 60,
            request_timeout_secs: 30,
            user_agent: format!("arteplus7/{}", env!("CARGO_PKG_VERSION")),
            api_base: "https://www.arte.tv".to_string(),
            player_base: "https://api.arte.tv".to_string(),
            disk_cache: true,
            retry: RetryConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=200).contains(&self.page_limit) {
            return Err(ConfigError::Invalid(format!(
                "page_limit must be between 1 and 200, got {}",
                self.page_limit
            )));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid(format!(
                    "country must be a two-letter code, got '{}'",
                    country
                )));
            }
        }
        Ok(())
    }

    /// Stream selection preferences derived from this configuration.
    pub fn stream_preferences(&self) -> StreamPreferences {
        StreamPreferences {
            language: self.language,
            quality: self.quality,
            protocol: self.protocol,
        }
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn stream_ttl(&self) -> Duration {
        Duration::from_secs(self.stream_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Path of the configuration file.
///
/// - Linux: ~/.config/arteplus7/config.toml
/// - macOS: ~/Library/Application Support/ch.wenner.arteplus7/config.toml
/// - Windows: %APPDATA%\wenner\arteplus7\config\config.toml
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = directories::ProjectDirs::from("ch", "wenner", "arteplus7")
        .ok_or(ConfigError::ConfigDirectoryNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Loads the configuration, writing a default file if none exists.
pub fn load_or_init() -> Result<ResolverConfig, ConfigError> {
    load_or_init_at(&config_path()?)
}

/// Loads the configuration from `path`, writing defaults there if missing.
pub fn load_or_init_at(path: &Path) -> Result<ResolverConfig, ConfigError> {
    if !path.exists() {
        let config = ResolverConfig::default();
        let content = toml::to_string_pretty(&config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!("created default config at {}", path.display());
        return Ok(config);
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: ResolverConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}
