//! In-process memo of aggregated rates so repeated lookups for the same
//! symbol within one run reuse the fan-out result. Failures are never
//! stored; only successful aggregates land here.

use crate::model::AggregatedRate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Default)]
pub struct RateCache {
    inner: Arc<Mutex<HashMap<String, AggregatedRate>>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, symbol: &str) -> Option<AggregatedRate> {
        let cache = self.inner.lock().await;
        let value = cache.get(symbol).cloned();
        if value.is_some() {
            debug!(symbol, "rate cache HIT");
        } else {
            debug!(symbol, "rate cache MISS");
        }
        value
    }

    pub async fn put(&self, rate: AggregatedRate) {
        let mut cache = self.inner.lock().await;
        debug!(symbol = %rate.symbol, "rate cache PUT");
        cache.insert(rate.symbol.clone(), rate);
    }
}
