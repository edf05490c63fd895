//! Failure taxonomy for the rate and ledger layers.
//!
//! Provider failures stay below the aggregator and are never propagated
//! raw to callers; aggregation and ledger failures are the structural
//! results the outer layers see.

use crate::model::AssetClass;
use thiserror::Error;

/// A single provider's failure modes. Always absorbed by the aggregator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("network error from {provider}: {message}")]
    Network { provider: String, message: String },

    #[error("malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("{provider} does not support symbol {symbol}")]
    UnsupportedSymbol { provider: String, symbol: String },

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("no provider configured for asset class {0}")]
    NoProviderConfigured(AssetClass),

    #[error("all providers failed for symbol {0}")]
    AllProvidersFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("insufficient holdings for {symbol}: held {held}, tried to sell {requested}")]
    InsufficientHoldings {
        symbol: String,
        held: f64,
        requested: f64,
    },

    #[error("transaction store error: {0}")]
    Storage(String),
}
