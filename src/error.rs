// src/error.rs
//! Exchange error taxonomy. The variant decides who handles a failure:
//! `Config` and `Auth` stop the run, everything else is retried or
//! absorbed at the layer that caused it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Invalid or missing configuration. Not retryable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The exchange refused our credentials. Not retryable.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Timeouts, connection resets, 5xx, rate-limit responses. Safe to
    /// retry after a backoff.
    #[error("transient exchange error: {0}")]
    Transient(String),

    /// The exchange understood the order and said no. The order must
    /// not be retried verbatim; conditions are re-evaluated next tick.
    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    /// Lookup or cancel of an order the exchange no longer knows.
    /// Usually benign: the order reached a terminal state first.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// A response that arrived but could not be understood.
    #[error("market data error: {0}")]
    MarketData(String),
}

impl ExchangeError {
    /// Fatal errors end the run; everything else is survivable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Config(_) | ExchangeError::Auth(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Transient(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            ExchangeError::Transient(e.to_string())
        } else if e.is_decode() {
            ExchangeError::MarketData(e.to_string())
        } else {
            ExchangeError::Transient(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        ExchangeError::MarketData(e.to_string())
    }
}
