use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use crate::providers::{http_client, malformed, network_error, unsupported, validate_rate};
use crate::rate_provider::RateProvider;

pub const PROVIDER_ID: &str = "exchangerate-api";

/// Forex rates from the ExchangeRate-API v6 endpoint. Needs an API key.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    weight: f64,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, weight: f64) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            weight,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    conversion_rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Forex
    }

    #[instrument(name = "ExchangeRateApiFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError> {
        let (base, target) = symbol
            .forex_pair()
            .ok_or_else(|| unsupported(PROVIDER_ID, &symbol.name))?;

        let url = format!("{}/v6/{}/latest/{base}", self.base_url, self.api_key);
        debug!("Requesting forex rate for pair {}", symbol.name);

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

        let rate = data.conversion_rates.get(target).copied().ok_or_else(|| {
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
