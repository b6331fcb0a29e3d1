//! Exchange configuration: loose dictionary in, strict record out.
//!
//! Adapters accept a free-form dictionary of options (from a TOML file,
//! environment, or caller-constructed map) and normalize it into an
//! [`ExchangeConfig`] with typed defaults. Unrecognized keys are kept in
//! [`ExchangeConfig::raw`] for adapter-specific passthrough rather than
//! being dropped.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_limit() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    1
}

fn default_retry_backoff() -> f64 {
    2.0
}

/// Normalized exchange configuration.
///
/// Deserializes with `#[serde(default)]` so that a loose dictionary
/// missing any of these fields still produces a valid record. The raw
/// map is preserved separately so adapters can read their own
/// exchange-specific keys without this type needing to know about them.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs", rename = "timeout")]
    pub timeout_secs: u64,

    /// Requests per second allowed within the sliding window.
    #[serde(default = "default_rate_limit", alias = "rate_limit")]
    pub rate_limit: u32,

    /// Maximum retry attempts after the first call.
    #[serde(default = "default_max_retries", alias = "max_retries")]
    pub max_retries: u32,

    /// Base delay between retries, before backoff and jitter.
    #[serde(default = "default_retry_delay_secs", rename = "retry_delay")]
    pub retry_delay_secs: u64,

    /// Multiplicative backoff factor applied per retry attempt.
    #[serde(default = "default_retry_backoff", alias = "retry_backoff")]
    pub retry_backoff: f64,

    /// Enables verbose request/response logging.
    #[serde(default)]
    pub verbose: bool,

    /// Every key the caller supplied, including the typed ones above and
    /// any adapter-specific options (API keys, base URLs, chain IDs).
    #[serde(default, skip_deserializing)]
    pub raw: Value,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            rate_limit: default_rate_limit(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            retry_backoff: default_retry_backoff(),
            verbose: false,
            raw: Value::Object(serde_json::Map::new()),
        }
    }
}

impl ExchangeConfig {
    /// Normalize a loose JSON dictionary into a strict config, keeping
    /// the original dictionary around for adapter passthrough.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a typed field is present but has the
    /// wrong shape (e.g. `"timeout": "soon"`).
    pub fn from_dict(raw: Value) -> Result<Self> {
        let mut config: Self = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Config(format!("invalid exchange config: {e}")))?;
        config.raw = raw;
        Ok(config)
    }

    /// Parse a TOML document into a strict config via the same
    /// dictionary-normalization path as [`Self::from_dict`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document isn't valid TOML or a
    /// typed field has the wrong shape.
    pub fn from_toml_str(toml_src: &str) -> Result<Self> {
        let parsed: toml::Value = toml::from_str(toml_src)
            .map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        let json = serde_json::to_value(parsed)
            .map_err(|e| Error::Config(format!("TOML to JSON conversion failed: {e}")))?;
        Self::from_dict(json)
    }

    /// Look up an adapter-specific key from the preserved raw dictionary.
    #[must_use]
    pub fn raw_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
