pub mod disk;
pub mod memory;

use crate::error::LedgerError;
use crate::model::Transaction;
use async_trait::async_trait;

/// Repository consumed by the ledger. The core does not dictate a
/// storage format; it only needs an append and a full per-user load.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn load_transactions(&self, user: &str) -> Result<Vec<Transaction>, LedgerError>;
    async fn save_transaction(&self, tx: &Transaction) -> Result<(), LedgerError>;
}
