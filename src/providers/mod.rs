pub mod coingecko;
pub mod exchange_rate_api;
pub mod exchange_rate_host;
pub mod open_exchange_rates;
pub mod yahoo_finance;

use crate::error::ProviderError;

pub(crate) const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client a provider uses for one request.
pub(crate) fn http_client(provider: &str) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Network {
            provider: provider.to_string(),
            message: e.to_string(),
        })
}

pub(crate) fn network_error(provider: &str, e: reqwest::Error) -> ProviderError {
    ProviderError::Network {
        provider: provider.to_string(),
        message: e.to_string(),
    }
}

pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> ProviderError {
    ProviderError::MalformedResponse {
        provider: provider.to_string(),
        message: message.into(),
    }
}

pub(crate) fn unsupported(provider: &str, symbol: &str) -> ProviderError {
    ProviderError::UnsupportedSymbol {
        provider: provider.to_string(),
        symbol: symbol.to_string(),
    }
}

/// A quote only counts if the payload carried a positive finite number.
pub(crate) fn validate_rate(provider: &str, symbol: &str, rate: f64) -> Result<f64, ProviderError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(malformed(
            provider,
            format!("non-positive rate {rate} for symbol {symbol}"),
        ))
    }
}
