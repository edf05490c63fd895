use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use crate::providers::{http_client, malformed, network_error, unsupported, validate_rate};
use crate::rate_provider::RateProvider;

pub const PROVIDER_ID: &str = "exchangerate-host";

/// Forex rates from exchangerate.host. Symbols are `BASE_TARGET` pairs.
pub struct ExchangeRateHostProvider {
    base_url: String,
    weight: f64,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, weight: f64) -> Self {
        ExchangeRateHostProvider {
            base_url: base_url.to_string(),
            weight,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateHostProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Forex
    }

    #[instrument(name = "ExchangeRateHostFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError> {
        let (base, target) = symbol
            .forex_pair()
            .ok_or_else(|| unsupported(PROVIDER_ID, &symbol.name))?;

        let url = format!("{}/latest?base={base}&symbols={target}", self.base_url);
        debug!("Requesting forex rate from {}", url);

        let client = http_client(PROVIDER_ID)?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Network {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} for pair {}", response.status(), symbol.name),
            });
        }

        let data = response
            .json::<LatestResponse>()
            .await
            .map_err(|e| malformed(PROVIDER_ID, e.to_string()))?;

        let rate = data.rates.get(target).copied().ok_or_else(|| {
            malformed(PROVIDER_ID, format!("no rate for target currency {target}"))
        })?;
        let rate = validate_rate(PROVIDER_ID, &symbol.name, rate)?;

        Ok(RateQuote {
            symbol: symbol.name.clone(),
            rate,
            provider_id: PROVIDER_ID.to_string(),
            weight: self.weight,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_latest_server(base: &str, target: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", base))
            .and(query_param("symbols", target))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_forex_fetch() {
        let server = mock_latest_server("USD", "EUR", r#"{"base": "USD", "rates": {"EUR": 0.9123}}"#).await;
        let provider = ExchangeRateHostProvider::new(&server.uri(), 1.0);

        let quote = provider
            .fetch_rate(&Symbol::new("USD_EUR", AssetClass::Forex))
            .await
            .unwrap();

        assert_eq!(quote.rate, 0.9123);
        assert_eq!(quote.provider_id, "exchangerate-host");
    }

    #[tokio::test]
    async fn test_missing_target_rate_is_malformed() {
        let server = mock_latest_server("USD", "EUR", r#"{"base": "USD", "rates": {}}"#).await;
        let provider = ExchangeRateHostProvider::new(&server.uri(), 1.0);

        let result = provider
            .fetch_rate(&Symbol::new("USD_EUR", AssetClass::Forex))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_pair_name_is_unsupported() {
        let provider = ExchangeRateHostProvider::new("http://unused", 1.0);
        let result = provider
            .fetch_rate(&Symbol::new("USDEUR", AssetClass::Forex))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::UnsupportedSymbol { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_crypto_symbol() {
        let provider = ExchangeRateHostProvider::new("http://unused", 1.0);
        let result = provider
            .fetch_rate(&Symbol::new("bitcoin", AssetClass::Crypto))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::UnsupportedSymbol { .. })
        ));
    }
}
