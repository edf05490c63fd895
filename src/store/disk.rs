//! Disk-backed transaction store on a fjall keyspace. Transactions are
//! stored as JSON values under `user \x1f nanos \x1f seq` keys so a
//! per-user prefix scan returns the history in append order.

use crate::error::LedgerError;
use crate::model::Transaction;
use crate::store::TransactionStore;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const KEY_SEP: char = '\x1f';

pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    seq: AtomicU64,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(path).map_err(|e| LedgerError::Storage(e.to_string()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        let partition = keyspace
            .open_partition("transactions", PartitionCreateOptions::default())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(DiskStore {
            keyspace,
            partition,
            seq: AtomicU64::new(0),
        })
    }

    fn key_for(&self, tx: &Transaction) -> String {
        let nanos = tx.timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{}{KEY_SEP}{nanos:020}{KEY_SEP}{seq}", tx.user)
    }
}

#[async_trait]
impl TransactionStore for DiskStore {
    async fn load_transactions(&self, user: &str) -> Result<Vec<Transaction>, LedgerError> {
        let prefix = format!("{user}{KEY_SEP}");
        let mut transactions = Vec::new();
        for entry in self.partition.prefix(prefix) {
            let (_key, value) = entry.map_err(|e| LedgerError::Storage(e.to_string()))?;
            let tx: Transaction = serde_json::from_slice(&value)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            transactions.push(tx);
        }
        debug!(user, count = transactions.len(), "loaded transactions");
        Ok(transactions)
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), LedgerError> {
        let key = self.key_for(tx);
        let value = serde_json::to_vec(tx).map_err(|e| LedgerError::Storage(e.to_string()))?;
        self.partition
            .insert(key, value)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        // A recorded transaction must survive the process; buffered
        // persist is enough, fsync policy stays with the OS.
        self.keyspace
            .persist(fjall::PersistMode::Buffer)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        debug!(user = %tx.user, symbol = %tx.symbol, side = %tx.side, "appended transaction");
        Ok(())
    }
}
