//! Append-only transaction ledger and derived positions.
//!
//! Positions are never cached destructively: every query folds over the
//! full history again, so the ledger can later grow lot-based methods
//! without changing stored data.

use crate::error::LedgerError;
use crate::model::{Position, Side, Transaction};
use crate::store::TransactionStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// Tolerance for float drift when deciding whether a sell would push a
/// holding negative; selling exactly everything must succeed.
const QUANTITY_EPSILON: f64 = 1e-9;

pub struct Ledger {
    store: Arc<dyn TransactionStore>,
    allow_short: bool,
    // One async mutex per (user, symbol) so concurrent writers for the
    // same key are serialized; the holdings check and the append must
    // not interleave.
    write_locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn TransactionStore>, allow_short: bool) -> Self {
        Ledger {
            store,
            allow_short,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn write_lock(&self, user: &str, symbol: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap();
        locks
            .entry((user.to_string(), symbol.to_string()))
            .or_default()
            .clone()
    }

    /// Appends a transaction after validation. A sell that would push
    /// the net holding negative is rejected with `InsufficientHoldings`
    /// unless short selling is enabled; nothing is written on rejection.
    #[instrument(skip(self, tx), fields(user = %tx.user, symbol = %tx.symbol, side = %tx.side))]
    pub async fn record(&self, tx: Transaction) -> Result<(), LedgerError> {
        validate(&tx)?;

        let lock = self.write_lock(&tx.user, &tx.symbol);
        let _guard = lock.lock().await;

        if tx.side == Side::Sell && !self.allow_short {
            let position = self.position_of(&tx.user, &tx.symbol).await?;
            if position.net_quantity - tx.quantity < -QUANTITY_EPSILON {
                return Err(LedgerError::InsufficientHoldings {
                    symbol: tx.symbol.clone(),
                    held: position.net_quantity,
                    requested: tx.quantity,
                });
            }
        }

        self.store.save_transaction(&tx).await?;
        debug!("transaction recorded");
        Ok(())
    }

    /// Derives the current position for one (user, symbol). Pure fold
    /// over the stored history in timestamp order.
    pub async fn position_of(&self, user: &str, symbol: &str) -> Result<Position, LedgerError> {
        let transactions = self.store.load_transactions(user).await?;
        Ok(Position::from_transactions(symbol, &transactions))
    }

    /// Derives positions for every symbol the user has ever transacted,
    /// in symbol order. Symbols sold back to zero are included; callers
    /// that only care about open holdings filter on net quantity.
    pub async fn positions_of(&self, user: &str) -> Result<Vec<Position>, LedgerError> {
        let transactions = self.store.load_transactions(user).await?;
        let mut symbols: Vec<&str> = transactions.iter().map(|t| t.symbol.as_str()).collect();
        symbols.sort_unstable();
        symbols.dedup();

        Ok(symbols
            .into_iter()
            .map(|symbol| Position::from_transactions(symbol, &transactions))
            .collect())
    }
}

fn validate(tx: &Transaction) -> Result<(), LedgerError> {
    if tx.user.is_empty() {
        return Err(LedgerError::InvalidTransaction("empty user".to_string()));
    }
    if tx.symbol.is_empty() {
        return Err(LedgerError::InvalidTransaction("empty symbol".to_string()));
    }
    if !(tx.quantity.is_finite() && tx.quantity > 0.0) {
        return Err(LedgerError::InvalidTransaction(format!(
            "quantity must be positive, got {}",
            tx.quantity
        )));
    }
    if !(tx.price.is_finite() && tx.price > 0.0) {
        return Err(LedgerError::InvalidTransaction(format!(
            "price must be positive, got {}",
            tx.price
        )));
    }
    Ok(())
}
