use crate::domain::status::PluginStatus;
use crate::domain::transaction::Transaction;
use chrono::{DateTime, Duration, Utc};

/// Decides when a pending initial charge has waited too long for the gateway.
///
/// Only ledgers made of AUTHORIZE/PURCHASE rows qualify; once a capture or refund exists,
/// the payment has moved on and is left alone.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    expiration: Option<Duration>,
}

impl ExpiryPolicy {
    pub fn new(expiration: Option<Duration>) -> Self {
        Self { expiration }
    }

    /// Returns the latest row if it is an expired pending charge.
    pub fn expired<'a>(
        &self,
        ledger: &'a [Transaction],
        now: DateTime<Utc>,
    ) -> Option<&'a Transaction> {
        let expiration = self.expiration?;
        if !ledger.iter().all(|tx| tx.r#type.is_initial()) {
            return None;
        }

        let latest = ledger.last()?;
        if latest.status != PluginStatus::Pending {
            return None;
        }

        let deadline = latest.created_at.checked_add_signed(expiration)?;
        (now > deadline).then_some(latest)
    }
}
