#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paybridge::application::engine::ReconciliationEngine;
use paybridge::config::AdapterConfig;
use paybridge::domain::gateway::{ChargeParams, ChargeResult, RefundResult};
use paybridge::domain::ports::{Clock, GatewayClient, TransactionStore};
use paybridge::domain::request::{CallContext, PaymentRequest, PluginProperty};
use paybridge::domain::scope::Scope;
use paybridge::domain::transaction::Transaction;
use paybridge::error::{GatewayError, PaymentError, Result};
use paybridge::infrastructure::directory::StaticAccountDirectory;
use paybridge::infrastructure::in_memory::{InMemorySourceStore, InMemoryTransactionStore};
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn random_id(prefix: &str) -> String {
    let n: u64 = rand::thread_rng().r#gen();
    format!("{}-{:016x}", prefix, n)
}

pub fn request(scope: &Scope, payment_id: &str, payment_method_id: &str) -> PaymentRequest {
    PaymentRequest {
        kb_account_id: scope.account_id.clone(),
        kb_payment_id: payment_id.to_string(),
        kb_transaction_id: random_id("trx"),
        kb_payment_method_id: payment_method_id.to_string(),
        amount: "10".to_string(),
        currency: "USD".to_string(),
        properties: vec![PluginProperty::new("stripeToken", "tok_visa")],
        context: CallContext {
            account_id: scope.account_id.clone(),
            tenant_id: scope.tenant_id.clone(),
            created_date: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

/// Same payment, fresh transaction id.
pub fn follow_on(req: &PaymentRequest) -> PaymentRequest {
    PaymentRequest {
        kb_transaction_id: random_id("trx"),
        ..req.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Charge(ChargeParams),
    Capture(String),
    Refund(String),
    CreateCustomer(Option<String>),
    AttachSource(String, String),
}

/// Gateway double that records every call and answers from a script.
#[derive(Clone)]
pub struct RecordingGateway {
    pub calls: Arc<Mutex<Vec<GatewayCall>>>,
    charge_status: String,
    fail_charges: bool,
    delay: Duration,
    sequence: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            charge_status: "succeeded".to_string(),
            fail_charges: false,
            delay: Duration::ZERO,
            sequence: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        }
    }
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_charge_status(mut self, status: &str) -> Self {
        self.charge_status = status.to_string();
        self
    }

    pub fn failing_charges(mut self) -> Self {
        self.fail_charges = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn enter(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GatewayClient for RecordingGateway {
    async fn charge(&self, params: ChargeParams) -> std::result::Result<ChargeResult, GatewayError> {
        self.enter(GatewayCall::Charge(params.clone())).await;
        if self.fail_charges {
            return Err(GatewayError::CardDeclined("Your card was declined.".to_string()));
        }
        Ok(ChargeResult {
            id: self.next_id("ch"),
            amount: params.amount,
            currency: params.currency.to_lowercase(),
            status: self.charge_status.clone(),
        })
    }

    async fn capture(&self, reference: &str) -> std::result::Result<ChargeResult, GatewayError> {
        self.enter(GatewayCall::Capture(reference.to_string())).await;
        if reference.is_empty() {
            return Err(GatewayError::InvalidRequest("No such charge: ''".to_string()));
        }
        Ok(ChargeResult {
            id: reference.to_string(),
            amount: 1000,
            currency: "usd".to_string(),
            status: "succeeded".to_string(),
        })
    }

    async fn refund(&self, reference: &str) -> std::result::Result<RefundResult, GatewayError> {
        self.enter(GatewayCall::Refund(reference.to_string())).await;
        if reference.is_empty() {
            return Err(GatewayError::InvalidRequest("No such charge: ''".to_string()));
        }
        Ok(RefundResult {
            id: self.next_id("re"),
            charge: reference.to_string(),
            amount: 1000,
            currency: "usd".to_string(),
            status: "succeeded".to_string(),
        })
    }

    async fn create_customer(
        &self,
        description: Option<&str>,
    ) -> std::result::Result<String, GatewayError> {
        self.enter(GatewayCall::CreateCustomer(description.map(str::to_string)))
            .await;
        Ok(self.next_id("cus"))
    }

    async fn attach_source(
        &self,
        customer_id: &str,
        token: &str,
    ) -> std::result::Result<String, GatewayError> {
        self.enter(GatewayCall::AttachSource(
            customer_id.to_string(),
            token.to_string(),
        ))
        .await;
        Ok(self.next_id("card"))
    }

    async fn ping(&self) -> std::result::Result<(), GatewayError> {
        Ok(())
    }
}

/// Ledger whose appends always fail; reads delegate to an in-memory store.
#[derive(Default, Clone)]
pub struct BrokenLedger {
    inner: InMemoryTransactionStore,
}

#[async_trait]
impl TransactionStore for BrokenLedger {
    async fn append(&self, _tx: Transaction) -> Result<Transaction> {
        Err(PaymentError::Storage("disk full".to_string()))
    }

    async fn list_by_payment(
        &self,
        kb_payment_id: &str,
        scope: &Scope,
    ) -> Result<Vec<Transaction>> {
        self.inner.list_by_payment(kb_payment_id, scope).await
    }
}

#[derive(Clone)]
pub struct FixedClock(pub Arc<Mutex<DateTime<Utc>>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct Harness {
    pub engine: ReconciliationEngine,
    pub sources: InMemorySourceStore,
    pub ledger: InMemoryTransactionStore,
    pub gateway: RecordingGateway,
}

pub fn harness(gateway: RecordingGateway) -> Harness {
    harness_with_config(gateway, AdapterConfig::default())
}

pub fn harness_with_config(gateway: RecordingGateway, config: AdapterConfig) -> Harness {
    let sources = InMemorySourceStore::new();
    let ledger = InMemoryTransactionStore::new();
    let engine = ReconciliationEngine::new(
        Box::new(sources.clone()),
        Box::new(ledger.clone()),
        Box::new(gateway.clone()),
        Box::new(StaticAccountDirectory::new()),
        config,
    );
    Harness {
        engine,
        sources,
        ledger,
        gateway,
    }
}

pub const REPLAY_HEADER: [&str; 10] = [
    "operation",
    "account_id",
    "tenant_id",
    "payment_id",
    "transaction_id",
    "payment_method_id",
    "amount",
    "currency",
    "created_date",
    "properties",
];

/// Writes a replay file that registers one payment method and purchases against it `payments` times.
pub fn generate_replay_csv(path: &Path, payments: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(REPLAY_HEADER)?;
    wtr.write_record([
        "add_payment_method",
        "acc1",
        "t1",
        "",
        "",
        "pm1",
        "",
        "",
        "2024-01-01T00:00:00Z",
        "stripeToken=tok_visa",
    ])?;

    for i in 1..=payments {
        wtr.write_record([
            "purchase",
            "acc1",
            "t1",
            &format!("pay{}", i),
            &format!("trx{}", i),
            "pm1",
            "1.00",
            "USD",
            "2024-01-01T00:00:00Z",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
