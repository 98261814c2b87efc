mod common;

use common::{RecordingGateway, follow_on, harness, harness_with_config, request};
use paybridge::config::AdapterConfig;
use paybridge::domain::ports::TransactionStore;
use paybridge::domain::scope::Scope;
use paybridge::domain::status::PluginStatus;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_operations_on_one_payment_are_serialized() {
    let h = harness(RecordingGateway::new().with_delay(Duration::from_millis(20)));
    let scope = Scope::new("acc1", "t1");
    let req = request(&scope, "pay1", "pm1");
    h.engine.add_payment_method(&req).await.unwrap();
    h.engine.authorize(&req).await.unwrap();

    let engine = Arc::new(h.engine);
    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        let req = follow_on(&req);
        handles.push(tokio::spawn(async move { engine.capture(&req).await }));
    }
    for handle in handles {
        let info = handle.await.unwrap().unwrap();
        assert_eq!(info.status, PluginStatus::Processed);
    }

    assert_eq!(h.gateway.max_in_flight.load(Ordering::SeqCst), 1);

    let rows = h.ledger.list_by_payment("pay1", &scope).await.unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_payments_run_concurrently() {
    let h = harness(RecordingGateway::new().with_delay(Duration::from_millis(50)));
    let scope = Scope::new("acc1", "t1");
    h.engine
        .add_payment_method(&request(&scope, "", "pm1"))
        .await
        .unwrap();

    let engine = Arc::new(h.engine);
    let mut handles = Vec::new();
    for i in 0..5 {
        let engine = engine.clone();
        let req = request(&scope, &format!("pay{}", i), "pm1");
        handles.push(tokio::spawn(async move { engine.purchase(&req).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().status, PluginStatus::Processed);
    }

    assert!(h.gateway.max_in_flight.load(Ordering::SeqCst) > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unserialized_engine_still_records_every_attempt() {
    let config = AdapterConfig::from_toml_str("serialize_payments = false").unwrap();
    let h = harness_with_config(RecordingGateway::new(), config);
    let scope = Scope::new("acc1", "t1");
    let req = request(&scope, "pay1", "pm1");
    h.engine.add_payment_method(&req).await.unwrap();
    h.engine.authorize(&req).await.unwrap();

    let engine = Arc::new(h.engine);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        let req = follow_on(&req);
        handles.push(tokio::spawn(async move { engine.capture(&req).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let rows = h.ledger.list_by_payment("pay1", &scope).await.unwrap();
    assert_eq!(rows.len(), 11);
}
