//! Fan-out across every configured provider for a symbol's asset class
//! and reconciliation of the answers into a single weighted-average rate.

use crate::cache::RateCache;
use crate::error::{AggregationError, ProviderError};
use crate::model::{AggregatedRate, RateQuote, Symbol};
use crate::rate_provider::RateProvider;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct RateAggregator {
    providers: Vec<Arc<dyn RateProvider>>,
    timeout: Duration,
    cache: RateCache,
}

impl RateAggregator {
    pub fn new(providers: Vec<Arc<dyn RateProvider>>, timeout: Duration) -> Self {
        RateAggregator {
            providers,
            timeout,
            cache: RateCache::new(),
        }
    }

    /// Queries every provider able to serve `symbol` and reconciles the
    /// valid quotes into one rate.
    ///
    /// Providers run concurrently and independently; one failing or slow
    /// source never blocks the others. A provider exceeding the per-call
    /// timeout counts as failed. The result does not depend on response
    /// arrival order: quotes are combined with a commutative weighted sum
    /// in configuration order.
    #[instrument(name = "AggregateRate", skip(self), fields(symbol = %symbol))]
    pub async fn get_rate(&self, symbol: &Symbol) -> Result<AggregatedRate, AggregationError> {
        let eligible: Vec<&Arc<dyn RateProvider>> = self
            .providers
            .iter()
            .filter(|p| p.supports(symbol.asset_class))
            .collect();

        if eligible.is_empty() {
            return Err(AggregationError::NoProviderConfigured(symbol.asset_class));
        }

        if let Some(cached) = self.cache.get(&symbol.name).await {
            return Ok(cached);
        }

        let fetches = eligible.iter().map(|provider| async move {
            match tokio::time::timeout(self.timeout, provider.fetch_rate(symbol)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider.id().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            }
        });
        let results = join_all(fetches).await;

        let mut quotes: Vec<RateQuote> = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(quote) => {
                    debug!(
                        provider = %quote.provider_id,
                        rate = quote.rate,
                        weight = quote.weight,
                        "provider quote accepted"
                    );
                    quotes.push(quote);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "provider quote discarded"),
            }
        }

        if quotes.is_empty() {
            return Err(AggregationError::AllProvidersFailed(symbol.name.clone()));
        }

        let rate = weighted_average(&quotes);
        let aggregated = AggregatedRate {
            symbol: symbol.name.clone(),
            rate,
            quote_count: quotes.len(),
            timestamp: Utc::now(),
        };
        self.cache.put(aggregated.clone()).await;
        Ok(aggregated)
    }
}

/// `Σ(rate·weight) / Σ(weight)` over all valid quotes. Every quote
/// participates; provider trust is already encoded in the weights, so
/// nothing is discarded as an outlier. When the weights sum to zero
/// (misconfiguration) this degrades to a plain arithmetic mean instead
/// of dividing by zero.
fn weighted_average(quotes: &[RateQuote]) -> f64 {
    let total_weight: f64 = quotes.iter().map(|q| q.weight).sum();
    if total_weight > 0.0 {
        quotes.iter().map(|q| q.rate * q.weight).sum::<f64>() / total_weight
    } else {
        quotes.iter().map(|q| q.rate).sum::<f64>() / quotes.len() as f64
    }
}
