use crate::domain::scope::Scope;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type PaymentKey = (Scope, String);

/// Async locks keyed by `(scope, kbPaymentId)`.
///
/// Holding the guard serializes every operation on one payment, so a capture or refund
/// always observes the row written by the operation before it. Entries are held weakly and
/// pruned once no guard references them.
#[derive(Default)]
pub struct PaymentLocks {
    entries: Mutex<HashMap<PaymentKey, Weak<AsyncMutex<()>>>>,
}

impl PaymentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, scope: &Scope, kb_payment_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let key = (scope.clone(), kb_payment_id.to_string());
            match entries.get(&key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    entries.retain(|_, weak| weak.strong_count() > 0);
                    let lock = Arc::new(AsyncMutex::new(()));
                    entries.insert(key, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }
}
