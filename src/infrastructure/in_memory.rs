use crate::domain::ports::{SourceStore, TransactionStore};
use crate::domain::scope::Scope;
use crate::domain::source::PaymentSource;
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment sources.
///
/// Rows are kept in insertion order; ids are assigned from the row count under the write lock.
#[derive(Default, Clone)]
pub struct InMemorySourceStore {
    sources: Arc<RwLock<Vec<PaymentSource>>>,
}

impl InMemorySourceStore {
    /// Creates a new, empty in-memory source store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every active source for the payment method as deleted.
    ///
    /// Returns the number of rows affected.
    pub async fn soft_delete(&self, kb_payment_method_id: &str, scope: &Scope) -> usize {
        let mut sources = self.sources.write().await;
        let mut affected = 0;
        for source in sources
            .iter_mut()
            .filter(|s| !s.is_deleted && s.kb_payment_method_id == kb_payment_method_id)
            .filter(|s| &s.scope == scope)
        {
            source.is_deleted = true;
            affected += 1;
        }
        affected
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn save(&self, mut source: PaymentSource) -> Result<PaymentSource> {
        let mut sources = self.sources.write().await;
        source.id = sources.len() as u64 + 1;
        sources.push(source.clone());
        Ok(source)
    }

    async fn find(&self, kb_payment_method_id: &str, scope: &Scope) -> Result<PaymentSource> {
        let sources = self.sources.read().await;
        sources
            .iter()
            .find(|s| {
                !s.is_deleted && s.kb_payment_method_id == kb_payment_method_id && &s.scope == scope
            })
            .cloned()
            .ok_or_else(|| {
                PaymentError::NotFound(format!("payment source for {}", kb_payment_method_id))
            })
    }
}

/// A thread-safe in-memory ledger.
///
/// Append order is the ledger order, so `list_by_payment` is a filtered scan.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn append(&self, mut tx: Transaction) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        tx.id = transactions.len() as u64 + 1;
        transactions.push(tx.clone());
        Ok(tx)
    }

    async fn list_by_payment(
        &self,
        kb_payment_id: &str,
        scope: &Scope,
    ) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .filter(|tx| tx.kb_payment_id == kb_payment_id && &tx.scope == scope)
            .cloned()
            .collect())
    }
}
