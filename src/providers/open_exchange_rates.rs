use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use crate::providers::{http_client, malformed, network_error, unsupported, validate_rate};
use crate::rate_provider::RateProvider;

pub const PROVIDER_ID: &str = "open-exchange-rates";

/// Forex rates from Open Exchange Rates. The free tier only publishes
/// USD-based rates, so non-USD base pairs are derived as a cross rate.
pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    weight: f64,
}

impl OpenExchangeRatesProvider {
    pub fn new(base_url: &str, app_id: &str, weight: f64) -> Self {
        OpenExchangeRatesProvider {
            base_url: base_url.to_string(),
            app_id: app_id.to_string(),
            weight,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Forex
    }

    #[instrument(name = "OpenExchangeRatesFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError> {
        let (base, target) = symbol
            .forex_pair()
            .ok_or_else(|| unsupported(PROVIDER_ID, &symbol.name))?;

        let url = format!("{}/api/latest.json?app_id={}", self.base_url, self.app_id);
        debug!("Requesting forex rates for pair {}", symbol.name);

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

        let rate = if base == "USD" {
            data.rates.get(target).copied()
        } else {
            // Cross rate through the USD-based table.
            match (data.rates.get(base), data.rates.get(target)) {
                (Some(base_rate), Some(target_rate)) if *base_rate != 0.0 => {
                    Some(target_rate / base_rate)
                }
                _ => None,
            }
        }
        .ok_or_else(|| {
            malformed(
                PROVIDER_ID,
                format!("no usable rates for pair {base}/{target}"),
            )
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

    async fn mock_latest_server(app_id: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/latest.json"))
            .and(query_param("app_id", app_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_usd_base_fetch() {
        let body = r#"{"base": "USD", "rates": {"EUR": 0.92, "GBP": 0.79}}"#;
        let server = mock_latest_server("test-app-id", body).await;
        let provider = OpenExchangeRatesProvider::new(&server.uri(), "test-app-id", 0.9);

        let quote = provider
            .fetch_rate(&Symbol::new("USD_EUR", AssetClass::Forex))
            .await
            .unwrap();

        assert_eq!(quote.rate, 0.92);
    }

    #[tokio::test]
    async fn test_cross_rate_for_non_usd_base() {
        let body = r#"{"base": "USD", "rates": {"EUR": 0.92, "GBP": 0.80}}"#;
        let server = mock_latest_server("test-app-id", body).await;
        let provider = OpenExchangeRatesProvider::new(&server.uri(), "test-app-id", 1.0);

        let quote = provider
            .fetch_rate(&Symbol::new("EUR_GBP", AssetClass::Forex))
            .await
            .unwrap();

        // GBP per EUR = 0.80 / 0.92
        assert!((quote.rate - 0.80 / 0.92).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_unknown_currency_is_malformed() {
        let body = r#"{"base": "USD", "rates": {"EUR": 0.92}}"#;
        let server = mock_latest_server("test-app-id", body).await;
        let provider = OpenExchangeRatesProvider::new(&server.uri(), "test-app-id", 1.0);

        let result = provider
            .fetch_rate(&Symbol::new("USD_XXX", AssetClass::Forex))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::MalformedResponse { .. })
        ));
    }
}
