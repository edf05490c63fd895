use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use crate::providers::{http_client, malformed, network_error, unsupported, validate_rate};
use crate::rate_provider::RateProvider;

pub const PROVIDER_ID: &str = "coingecko";

/// Crypto spot prices in USD from the CoinGecko simple price API.
/// Symbols are CoinGecko coin ids, e.g. "bitcoin" or "ethereum".
pub struct CoinGeckoProvider {
    base_url: String,
    weight: f64,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, weight: f64) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            weight,
        }
    }
}

// Response shape: {"bitcoin": {"usd": 30000.0}}
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Crypto
    }

    #[instrument(name = "CoinGeckoRateFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError> {
        if !self.supports(symbol.asset_class) {
            return Err(unsupported(PROVIDER_ID, &symbol.name));
        }

        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies=usd",
            self.base_url, symbol.name
        );
        debug!("Requesting crypto price from {}", url);

        let client = http_client(PROVIDER_ID)?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Network {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} for coin {}", response.status(), symbol.name),
            });
        }

        let data = response
            .json::<SimplePriceResponse>()
            .await
            .map_err(|e| malformed(PROVIDER_ID, e.to_string()))?;

        let rate = data
            .get(&symbol.name)
            .and_then(|prices| prices.get("usd"))
            .copied()
            .ok_or_else(|| {
                malformed(PROVIDER_ID, format!("no usd price for coin {}", symbol.name))
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

    async fn mock_price_server(coin: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", coin))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_crypto_fetch() {
        let server = mock_price_server("bitcoin", r#"{"bitcoin": {"usd": 30123.5}}"#).await;
        let provider = CoinGeckoProvider::new(&server.uri(), 0.9);

        let quote = provider
            .fetch_rate(&Symbol::new("bitcoin", AssetClass::Crypto))
            .await
            .unwrap();

        assert_eq!(quote.rate, 30123.5);
        assert_eq!(quote.provider_id, "coingecko");
        assert_eq!(quote.weight, 0.9);
    }

    #[tokio::test]
    async fn test_missing_coin_is_malformed() {
        let server = mock_price_server("dogecoin", r#"{}"#).await;
        let provider = CoinGeckoProvider::new(&server.uri(), 1.0);

        let result = provider
            .fetch_rate(&Symbol::new("dogecoin", AssetClass::Crypto))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_equity_symbol() {
        let provider = CoinGeckoProvider::new("http://unused", 1.0);
        let result = provider
            .fetch_rate(&Symbol::new("AAPL", AssetClass::Equity))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::UnsupportedSymbol { .. })
        ));
    }
}
