//! In-memory transaction store, mainly for tests and the default
//! configuration-less run.

use crate::error::LedgerError;
use crate::model::Transaction;
use crate::store::TransactionStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<Transaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn load_transactions(&self, user: &str) -> Result<Vec<Transaction>, LedgerError> {
        let txs = self.inner.lock().await;
        Ok(txs.iter().filter(|t| t.user == user).cloned().collect())
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), LedgerError> {
        let mut txs = self.inner.lock().await;
        debug!(user = %tx.user, symbol = %tx.symbol, side = %tx.side, "appending transaction");
        txs.push(tx.clone());
        Ok(())
    }
}
