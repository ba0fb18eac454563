//! Indexer connection settings.

use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.tzkt.io";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

pub const ENV_BASE_URL: &str = "STOREVIEW_INDEXER_URL";
pub const ENV_TIMEOUT_MS: &str = "STOREVIEW_INDEXER_TIMEOUT_MS";
pub const ENV_RETRIES: &str = "STOREVIEW_INDEXER_RETRIES";

/// Where big map entries are fetched from and how patiently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexerConfig {
    pub base_url: String,
    /// Per-request timeout, applied by the HTTP client.
    pub timeout: Duration,
    /// Extra attempts after a 502 answer.
    pub retry_attempts: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl IndexerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    /// Defaults overridden by `STOREVIEW_INDEXER_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            url::Url::parse(&url).map_err(|e| {
                Error::config(format!("{} is not a valid URL: {}", ENV_BASE_URL, e))
            })?;
            config.base_url = url;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                Error::config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    ENV_TIMEOUT_MS, ms
                ))
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = lookup(ENV_RETRIES) {
            config.retry_attempts = retries.trim().parse().map_err(|_| {
                Error::config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_RETRIES, retries
                ))
            })?;
        }

        Ok(config)
    }
}
