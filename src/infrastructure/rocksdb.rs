use crate::domain::ports::{SourceStore, TransactionStore};
use crate::domain::scope::Scope;
use crate::domain::source::PaymentSource;
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Column Family for payment method → gateway source rows.
pub const CF_SOURCES: &str = "payment_sources";
/// Column Family for ledger rows.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family holding the last id handed out per table.
pub const CF_SEQUENCES: &str = "sequences";

/// A persistent store implementation using RocksDB.
///
/// Row keys are `tenant | account | owner id | row id`, each string component length
/// prefixed and the row id big-endian. A prefix scan therefore returns one payment's ledger
/// (or one payment method's sources) in insertion order, and never crosses tenants.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and id counters).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    next_source_id: Arc<AtomicU64>,
    next_transaction_id: Arc<AtomicU64>,
    sequence_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and restores the id counters.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_SOURCES, CF_TRANSACTIONS, CF_SEQUENCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let store = Self {
            db: Arc::new(db),
            next_source_id: Arc::new(AtomicU64::new(0)),
            next_transaction_id: Arc::new(AtomicU64::new(0)),
            sequence_lock: Arc::default(),
        };
        store
            .next_source_id
            .store(store.last_sequence(CF_SOURCES)?, Ordering::SeqCst);
        store
            .next_transaction_id
            .store(store.last_sequence(CF_TRANSACTIONS)?, Ordering::SeqCst);

        Ok(store)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Storage(format!("{} column family not found", name)))
    }

    fn last_sequence(&self, table: &str) -> Result<u64> {
        let cf = self.cf(CF_SEQUENCES)?;
        match self.db.get_cf(&cf, table.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PaymentError::Storage(format!("corrupt sequence for {}", table))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Writes a row together with its table's sequence so both land atomically.
    ///
    /// Concurrent writers may finish out of id order; the stored sequence only ever grows.
    fn insert(&self, table: &str, key: Vec<u8>, id: u64, value: Vec<u8>) -> Result<()> {
        let cf = self.cf(table)?;
        let seq = self.cf(CF_SEQUENCES)?;

        let _guard = self
            .sequence_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let last = self.last_sequence(table)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, key, value);
        batch.put_cf(&seq, table.as_bytes(), id.max(last).to_be_bytes());
        self.db.write(batch)?;

        Ok(())
    }

    fn scan_prefix(&self, table: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf(table)?;
        let mut rows = Vec::new();

        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }

        Ok(rows)
    }

    /// Marks every active source for the payment method as deleted.
    ///
    /// Returns the number of rows affected.
    pub fn soft_delete(&self, kb_payment_method_id: &str, scope: &Scope) -> Result<usize> {
        let cf = self.cf(CF_SOURCES)?;
        let prefix = owner_prefix(scope, kb_payment_method_id);

        let mut batch = WriteBatch::default();
        let mut affected = 0;
        for (key, value) in self.scan_prefix(CF_SOURCES, &prefix)? {
            let mut source: PaymentSource = serde_json::from_slice(&value)?;
            if source.is_deleted {
                continue;
            }
            source.is_deleted = true;
            batch.put_cf(&cf, key, serde_json::to_vec(&source)?);
            affected += 1;
        }
        self.db.write(batch)?;

        Ok(affected)
    }
}

fn push_component(key: &mut Vec<u8>, component: &str) {
    key.extend_from_slice(&(component.len() as u32).to_be_bytes());
    key.extend_from_slice(component.as_bytes());
}

fn owner_prefix(scope: &Scope, owner_id: &str) -> Vec<u8> {
    let mut key = Vec::new();
    push_component(&mut key, &scope.tenant_id);
    push_component(&mut key, &scope.account_id);
    push_component(&mut key, owner_id);
    key
}

fn row_key(scope: &Scope, owner_id: &str, id: u64) -> Vec<u8> {
    let mut key = owner_prefix(scope, owner_id);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

#[async_trait]
impl SourceStore for RocksDBStore {
    async fn save(&self, mut source: PaymentSource) -> Result<PaymentSource> {
        source.id = self.next_source_id.fetch_add(1, Ordering::SeqCst) + 1;

        let key = row_key(&source.scope, &source.kb_payment_method_id, source.id);
        let value = serde_json::to_vec(&source)?;
        self.insert(CF_SOURCES, key, source.id, value)?;

        Ok(source)
    }

    async fn find(&self, kb_payment_method_id: &str, scope: &Scope) -> Result<PaymentSource> {
        let prefix = owner_prefix(scope, kb_payment_method_id);

        for (_key, value) in self.scan_prefix(CF_SOURCES, &prefix)? {
            let source: PaymentSource = serde_json::from_slice(&value)?;
            if !source.is_deleted {
                return Ok(source);
            }
        }

        Err(PaymentError::NotFound(format!(
            "payment source for {}",
            kb_payment_method_id
        )))
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn append(&self, mut tx: Transaction) -> Result<Transaction> {
        tx.id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst) + 1;

        let key = row_key(&tx.scope, &tx.kb_payment_id, tx.id);
        let value = serde_json::to_vec(&tx)?;
        self.insert(CF_TRANSACTIONS, key, tx.id, value)?;

        Ok(tx)
    }

    async fn list_by_payment(
        &self,
        kb_payment_id: &str,
        scope: &Scope,
    ) -> Result<Vec<Transaction>> {
        let prefix = owner_prefix(scope, kb_payment_id);

        self.scan_prefix(CF_TRANSACTIONS, &prefix)?
            .into_iter()
            .map(|(_key, value)| serde_json::from_slice(&value).map_err(PaymentError::from))
            .collect()
    }
}
