//! Composes ledger positions with aggregated rates into market values
//! and unrealized gains. Rate failures degrade the affected symbol to an
//! unknown valuation; they never fail the whole call.

use crate::aggregator::RateAggregator;
use crate::alerts::AlertMonitor;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::model::{AggregatedRate, Position, Symbol};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Holdings below this are treated as fully closed positions.
const HOLDING_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SymbolValuation {
    pub symbol: String,
    pub position: Position,
    pub rate: Option<AggregatedRate>,
    pub market_value: Option<f64>,
    pub unrealized_gain: Option<f64>,
    /// Why the valuation is unknown, when it is.
    pub error: Option<String>,
}

pub struct ValuationService {
    ledger: Arc<Ledger>,
    aggregator: Arc<RateAggregator>,
    symbols: HashMap<String, Symbol>,
    alerts: Option<Arc<AlertMonitor>>,
}

impl ValuationService {
    pub fn new(
        ledger: Arc<Ledger>,
        aggregator: Arc<RateAggregator>,
        symbols: Vec<Symbol>,
        alerts: Option<Arc<AlertMonitor>>,
    ) -> Self {
        ValuationService {
            ledger,
            aggregator,
            symbols: symbols.into_iter().map(|s| (s.name.clone(), s)).collect(),
            alerts,
        }
    }

    /// Values every open holding of `user`. Each symbol gets its own
    /// entry; a symbol whose rate cannot be aggregated is surfaced with
    /// a null valuation and the failure reason, never omitted.
    #[instrument(skip(self))]
    pub async fn valuate(&self, user: &str) -> Result<Vec<SymbolValuation>, LedgerError> {
        let positions = self.ledger.positions_of(user).await?;
        let open: Vec<Position> = positions
            .into_iter()
            .filter(|p| p.net_quantity.abs() > HOLDING_EPSILON)
            .collect();
        debug!(user, holdings = open.len(), "valuating open positions");

        let mut valuations = Vec::with_capacity(open.len());
        for position in open {
            valuations.push(self.valuate_position(position).await);
        }
        Ok(valuations)
    }

    async fn valuate_position(&self, position: Position) -> SymbolValuation {
        let Some(symbol) = self.symbols.get(&position.symbol) else {
            return SymbolValuation {
                symbol: position.symbol.clone(),
                position,
                rate: None,
                market_value: None,
                unrealized_gain: None,
                error: Some("symbol not configured".to_string()),
            };
        };

        match self.aggregator.get_rate(symbol).await {
            Ok(rate) => {
                if let Some(alerts) = &self.alerts {
                    alerts.observe(&symbol.name, rate.rate).await;
                }
                let market_value = position.net_quantity * rate.rate;
                let unrealized_gain =
                    market_value - position.net_quantity * position.avg_cost_basis;
                SymbolValuation {
                    symbol: symbol.name.clone(),
                    position,
                    rate: Some(rate),
                    market_value: Some(market_value),
                    unrealized_gain: Some(unrealized_gain),
                    error: None,
                }
            }
            Err(e) => SymbolValuation {
                symbol: symbol.name.clone(),
                position,
                rate: None,
                market_value: None,
                unrealized_gain: None,
                error: Some(e.to_string()),
            },
        }
    }
}
