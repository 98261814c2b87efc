use super::gateway::{ChargeParams, ChargeResult, RefundResult};
use super::request::CallContext;
use super::scope::Scope;
use super::source::PaymentSource;
use super::transaction::Transaction;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence for payment method → gateway source mappings.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Persists a new row and returns it with its assigned id. Never upserts.
    async fn save(&self, source: PaymentSource) -> Result<PaymentSource>;
    /// Returns the active source for the payment method, or `PaymentError::NotFound`.
    async fn find(&self, kb_payment_method_id: &str, scope: &Scope) -> Result<PaymentSource>;
}

/// Append-only ledger of attempted gateway operations.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new row and returns it with its assigned id.
    async fn append(&self, tx: Transaction) -> Result<Transaction>;
    /// All rows for the payment, oldest first. Empty when none exist.
    async fn list_by_payment(&self, kb_payment_id: &str, scope: &Scope)
    -> Result<Vec<Transaction>>;

    /// The most recently appended row for the payment.
    ///
    /// Follow-on operations (capture, refund) target this row's gateway reference.
    async fn latest_by_payment(
        &self,
        kb_payment_id: &str,
        scope: &Scope,
    ) -> Result<Option<Transaction>> {
        Ok(self.list_by_payment(kb_payment_id, scope).await?.pop())
    }
}

/// The operations the engine needs from the card-processing gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn charge(&self, params: ChargeParams) -> std::result::Result<ChargeResult, GatewayError>;
    async fn capture(&self, reference: &str) -> std::result::Result<ChargeResult, GatewayError>;
    async fn refund(&self, reference: &str) -> std::result::Result<RefundResult, GatewayError>;
    async fn create_customer(
        &self,
        description: Option<&str>,
    ) -> std::result::Result<String, GatewayError>;
    async fn attach_source(
        &self,
        customer_id: &str,
        token: &str,
    ) -> std::result::Result<String, GatewayError>;
    async fn ping(&self) -> std::result::Result<(), GatewayError>;
}

/// Lookup of account details owned by the billing orchestrator.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// The account's external key, or `None` when the account is unknown.
    async fn external_key(&self, account_id: &str, context: &CallContext)
    -> Result<Option<String>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub type SourceStoreBox = Box<dyn SourceStore>;
pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type GatewayClientBox = Box<dyn GatewayClient>;
pub type AccountDirectoryBox = Box<dyn AccountDirectory>;
pub type ClockBox = Box<dyn Clock>;
