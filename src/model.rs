//! Core domain types shared across the ledger, aggregator and valuation layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset class a symbol belongs to. Providers declare which classes they
/// can serve; the aggregator only fans out to matching providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
    Forex,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Equity => write!(f, "equity"),
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::Forex => write!(f, "forex"),
        }
    }
}

/// A tradeable identifier: a ticker ("AAPL"), a crypto id ("bitcoin") or a
/// currency pair ("USD_EUR"). Immutable, uniquely keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub asset_class: AssetClass,
}

impl Symbol {
    pub fn new(name: impl Into<String>, asset_class: AssetClass) -> Self {
        Symbol {
            name: name.into(),
            asset_class,
        }
    }

    /// Splits a forex pair name like "USD_EUR" into (base, target).
    /// Returns `None` for non-forex symbols or malformed names.
    pub fn forex_pair(&self) -> Option<(&str, &str)> {
        if self.asset_class != AssetClass::Forex {
            return None;
        }
        let (base, target) = self.name.split_once('_')?;
        if base.is_empty() || target.is_empty() {
            return None;
        }
        Some((base, target))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// One ledger entry. Immutable after creation; corrections are new
/// offsetting transactions, never edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub user: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Self {
        Transaction {
            user: user.into(),
            symbol: symbol.into(),
            side,
            quantity,
            price,
            timestamp: Utc::now(),
        }
    }
}

/// Derived holding for one (user, symbol). Never stored; recomputed from
/// the transaction history on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub net_quantity: f64,
    pub avg_cost_basis: f64,
}

impl Position {
    /// Folds a transaction slice into a position. Cost basis comes from
    /// BUY transactions only; sells reduce quantity but leave the average
    /// untouched (average-cost method).
    pub fn from_transactions(symbol: &str, transactions: &[Transaction]) -> Self {
        let mut ordered: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.symbol == symbol)
            .collect();
        ordered.sort_by_key(|t| t.timestamp);

        let mut net_quantity = 0.0;
        let mut bought_quantity = 0.0;
        let mut bought_cost = 0.0;
        for tx in ordered {
            match tx.side {
                Side::Buy => {
                    net_quantity += tx.quantity;
                    bought_quantity += tx.quantity;
                    bought_cost += tx.quantity * tx.price;
                }
                Side::Sell => net_quantity -= tx.quantity,
            }
        }

        let avg_cost_basis = if bought_quantity > 0.0 {
            bought_cost / bought_quantity
        } else {
            0.0
        };

        Position {
            symbol: symbol.to_string(),
            net_quantity,
            avg_cost_basis,
        }
    }
}

/// A single provider's answer for one symbol. Ephemeral; produced per
/// query and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub symbol: String,
    pub rate: f64,
    pub provider_id: String,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

/// The reconciled rate for one symbol after fan-out and weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRate {
    pub symbol: String,
    pub rate: f64,
    /// How many providers contributed a valid quote.
    pub quote_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(symbol: &str, side: Side, quantity: f64, price: f64) -> Transaction {
        Transaction::new("demo", symbol, side, quantity, price)
    }

    #[test]
    fn test_position_average_cost_from_buys_only() {
        let txs = vec![
            tx("AAPL", Side::Buy, 10.0, 100.0),
            tx("AAPL", Side::Buy, 10.0, 120.0),
        ];
        let pos = Position::from_transactions("AAPL", &txs);
        assert_eq!(pos.net_quantity, 20.0);
        assert_eq!(pos.avg_cost_basis, 110.0);
    }

    #[test]
    fn test_position_sell_reduces_quantity_not_basis() {
        let txs = vec![
            tx("AAPL", Side::Buy, 10.0, 100.0),
            tx("AAPL", Side::Buy, 10.0, 120.0),
            tx("AAPL", Side::Sell, 5.0, 150.0),
        ];
        let pos = Position::from_transactions("AAPL", &txs);
        assert_eq!(pos.net_quantity, 15.0);
        assert_eq!(pos.avg_cost_basis, 110.0);
    }

    #[test]
    fn test_position_ignores_other_symbols() {
        let txs = vec![
            tx("AAPL", Side::Buy, 10.0, 100.0),
            tx("MSFT", Side::Buy, 3.0, 300.0),
        ];
        let pos = Position::from_transactions("AAPL", &txs);
        assert_eq!(pos.net_quantity, 10.0);
        assert_eq!(pos.avg_cost_basis, 100.0);
    }

    #[test]
    fn test_position_empty_history() {
        let pos = Position::from_transactions("AAPL", &[]);
        assert_eq!(pos.net_quantity, 0.0);
        assert_eq!(pos.avg_cost_basis, 0.0);
    }

    #[test]
    fn test_forex_pair_parsing() {
        let pair = Symbol::new("USD_EUR", AssetClass::Forex);
        assert_eq!(pair.forex_pair(), Some(("USD", "EUR")));

        let stock = Symbol::new("AAPL", AssetClass::Equity);
        assert_eq!(stock.forex_pair(), None);

        let malformed = Symbol::new("USDEUR", AssetClass::Forex);
        assert_eq!(malformed.forex_pair(), None);
    }
}
