//! Client, cache and process settings.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `COINMARKETCAP_API_KEY` | required |
//! | `COINMARKETCAP_BASE_URL` | `https://pro-api.coinmarketcap.com/v1` |
//! | `REQUEST_TIMEOUT_SECONDS` | 30 |
//! | `MAX_RETRIES` | 3 |
//! | `RETRY_JITTER` | `false` |
//! | `RATE_LIMIT_REQUESTS` | 30 |
//! | `RATE_LIMIT_PERIOD` | 60 (seconds) |
//! | `CACHE_TTL_SECONDS` | 300 |
//! | `CACHE_MAX_SIZE` | 1000 |
//! | `LOG_LEVEL` | `info` |

use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::{Backoff, ConfigError, HttpAuth, ResponseCache, RetryConfig};

pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";
pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Upstream credential. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Randomize each backoff delay by +/- 50%.
    pub retry_jitter: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_period: Duration,
}

impl ClientConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_jitter: false,
            rate_limit_requests: 30,
            rate_limit_period: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_jitter(mut self, jitter: bool) -> Self {
        self.retry_jitter = jitter;
        self
    }

    pub fn with_rate_limit(mut self, requests: u32, period: Duration) -> Self {
        self.rate_limit_requests = requests;
        self.rate_limit_period = period;
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(self.max_retries).with_backoff(Backoff {
            jitter: self.retry_jitter,
            ..Backoff::default()
        })
    }

    pub fn auth(&self) -> HttpAuth {
        HttpAuth::Header {
            name: String::from(API_KEY_HEADER),
            value: self.api_key.expose().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Zero disables caching.
    pub ttl: Duration,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 1_000,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            ttl: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn build<V: Clone>(&self) -> ResponseCache<V> {
        ResponseCache::new(self.ttl, self.max_size)
    }
}

/// Everything the process entry point needs to wire the core together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client: ClientConfig,
    pub cache: CacheConfig,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = ApiKey::new(read("COINMARKETCAP_API_KEY").unwrap_or_default())?;
        let mut client = ClientConfig::new(api_key);

        if let Some(base_url) = read("COINMARKETCAP_BASE_URL") {
            client.base_url = base_url.trim().to_owned();
        }
        if let Some(secs) = parse_var::<u64>(&read, "REQUEST_TIMEOUT_SECONDS", "whole seconds")? {
            client.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&read, "MAX_RETRIES", "a non-negative integer")? {
            client.max_retries = retries;
        }
        if let Some(jitter) = parse_var::<bool>(&read, "RETRY_JITTER", "true or false")? {
            client.retry_jitter = jitter;
        }
        if let Some(requests) = parse_var::<u32>(&read, "RATE_LIMIT_REQUESTS", "a positive integer")? {
            client.rate_limit_requests = requests;
        }
        if let Some(secs) = parse_var::<u64>(&read, "RATE_LIMIT_PERIOD", "whole seconds")? {
            client.rate_limit_period = Duration::from_secs(secs);
        }

        let mut cache = CacheConfig::default();
        if let Some(secs) = parse_var::<u64>(&read, "CACHE_TTL_SECONDS", "whole seconds")? {
            cache.ttl = Duration::from_secs(secs);
        }
        if let Some(max_size) = parse_var::<usize>(&read, "CACHE_MAX_SIZE", "a positive integer")? {
            cache.max_size = max_size;
        }

        let log_level = read("LOG_LEVEL")
            .map(|level| level.trim().to_ascii_lowercase())
            .unwrap_or_else(|| String::from("info"));

        Ok(Self {
            client,
            cache,
            log_level,
        })
    }
}

fn parse_var<T>(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    read(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue {
                    name,
                    value: raw,
                    expected,
                })
        })
        .transpose()
}
