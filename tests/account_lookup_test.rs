mod common;

use async_trait::async_trait;
use common::{GatewayCall, RecordingGateway, request};
use paybridge::application::engine::ReconciliationEngine;
use paybridge::config::AdapterConfig;
use paybridge::domain::ports::AccountDirectory;
use paybridge::domain::request::CallContext;
use paybridge::domain::scope::Scope;
use paybridge::error::{PaymentError, Result};
use paybridge::infrastructure::directory::StaticAccountDirectory;
use paybridge::infrastructure::in_memory::{InMemorySourceStore, InMemoryTransactionStore};
use std::time::{Duration, Instant};

struct SlowDirectory;

#[async_trait]
impl AccountDirectory for SlowDirectory {
    async fn external_key(&self, _account_id: &str, _context: &CallContext) -> Result<Option<String>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Some("too-late".to_string()))
    }
}

struct BrokenDirectory;

#[async_trait]
impl AccountDirectory for BrokenDirectory {
    async fn external_key(&self, _account_id: &str, _context: &CallContext) -> Result<Option<String>> {
        Err(PaymentError::Storage("orchestrator offline".to_string()))
    }
}

fn engine(gateway: &RecordingGateway, directory: Box<dyn AccountDirectory>) -> ReconciliationEngine {
    let config = AdapterConfig::from_toml_str("account_lookup_timeout_secs = 1").unwrap();
    ReconciliationEngine::new(
        Box::new(InMemorySourceStore::new()),
        Box::new(InMemoryTransactionStore::new()),
        Box::new(gateway.clone()),
        directory,
        config,
    )
}

fn created_customer(gateway: &RecordingGateway) -> Option<Option<String>> {
    gateway.calls().into_iter().find_map(|call| match call {
        GatewayCall::CreateCustomer(description) => Some(description),
        _ => None,
    })
}

#[tokio::test]
async fn test_slow_lookup_is_bounded() {
    let gateway = RecordingGateway::new();
    let engine = engine(&gateway, Box::new(SlowDirectory));
    let req = request(&Scope::new("acc1", "t1"), "", "pm1");

    let started = Instant::now();
    engine.add_payment_method(&req).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(created_customer(&gateway), Some(None));
}

#[tokio::test]
async fn test_failed_lookup_creates_customer_without_description() {
    let gateway = RecordingGateway::new();
    let engine = engine(&gateway, Box::new(BrokenDirectory));
    let req = request(&Scope::new("acc1", "t1"), "", "pm1");

    engine.add_payment_method(&req).await.unwrap();
    assert_eq!(created_customer(&gateway), Some(None));
}

#[tokio::test]
async fn test_known_account_describes_customer() {
    let gateway = RecordingGateway::new();
    let directory = StaticAccountDirectory::new().with_account("acc1", "t1", "ACME-42");
    let engine = engine(&gateway, Box::new(directory));
    let req = request(&Scope::new("acc1", "t1"), "", "pm1");

    engine.add_payment_method(&req).await.unwrap();
    assert_eq!(created_customer(&gateway), Some(Some("ACME-42".to_string())));
}
