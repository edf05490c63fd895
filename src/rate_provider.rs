//! Contract every external rate source implements.

use crate::error::ProviderError;
use crate::model::{AssetClass, RateQuote, Symbol};
use async_trait::async_trait;

/// One external rate source. Implementations issue a single outbound
/// request per `fetch_rate` call; retry policy, timeouts and reconciling
/// disagreeing sources all belong to the aggregator.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Stable identifier used in quotes, logs and configuration.
    fn id(&self) -> &str;

    /// Trust weight applied when this provider's quote is averaged with
    /// others. Non-negative; 1.0 means default trust.
    fn weight(&self) -> f64;

    /// Whether this source can serve symbols of the given asset class.
    fn supports(&self, asset_class: AssetClass) -> bool;

    /// Fetch the current rate for `symbol`. A symbol outside the
    /// supported asset classes fails with `UnsupportedSymbol`.
    async fn fetch_rate(&self, symbol: &Symbol) -> Result<RateQuote, ProviderError>;
}
