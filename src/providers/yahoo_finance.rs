use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use crate::providers::{http_client, malformed, network_error, unsupported, validate_rate};
use crate::rate_provider::RateProvider;

pub const PROVIDER_ID: &str = "yahoo";

/// Equity prices from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    weight: f64,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, weight: f64) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            weight,
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl RateProvider for YahooFinanceProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Equity
    }

    #[instrument(name = "YahooRateFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError> {
        if !self.supports(symbol.asset_class) {
            return Err(unsupported(PROVIDER_ID, &symbol.name));
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol.name
        );
        debug!("Requesting equity price from {}", url);

        let client = http_client(PROVIDER_ID)?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Network {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} for symbol {}", response.status(), symbol.name),
            });
        }

        let data = response
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| malformed(PROVIDER_ID, e.to_string()))?;

        let item = data
            .chart
            .result
            .first()
            .ok_or_else(|| malformed(PROVIDER_ID, format!("no chart data for {}", symbol.name)))?;

        let rate = validate_rate(PROVIDER_ID, &symbol.name, item.meta.regular_market_price)?;

        Ok(RateQuote {
            symbol: symbol.name.clone(),
            rate,
            provider_id: PROVIDER_ID.to_string(),
            weight: self.weight,
            timestamp: Utc::now(),
        })
    }
}
