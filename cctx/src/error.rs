//! Typed error taxonomy shared by every exchange adapter.

use thiserror::Error;

/// Errors an exchange adapter can report.
///
/// Only [`Error::Network`] and [`Error::RateLimit`] are retryable; see
/// [`Error::is_retryable`].
#[derive(Error, Debug)]
pub enum Error {
    /// Catch-all for exchange-reported failures that don't fit a more
    /// specific variant (e.g. an unexpected response shape).
    #[error("exchange error: {0}")]
    Exchange(String),

    /// Transport-level failure: connection reset, DNS failure, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The exchange rejected the request for exceeding its own rate
    /// limit, independent of our local limiter.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Invalid or expired API credentials, bad signature, wrong chain.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Wallet or account balance insufficient to cover the order.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Order parameters fail validation (bad price, size, tick, side).
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// No market exists for the given identifier.
    #[error("market not found: {0}")]
    MarketNotFound(String),

    /// Underlying HTTP transport failure from `reqwest`.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parsing failure.
    #[error("config error: {0}")]
    Config(String),

    /// URL parsing failure.
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// `true` for the two kinds the retry pipeline (spec'd in
    /// [`crate::retry`]) will automatically retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
