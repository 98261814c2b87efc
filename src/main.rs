use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paybridge::application::engine::{Operation, ReconciliationEngine};
use paybridge::config::AdapterConfig;
use paybridge::domain::ports::{SourceStoreBox, TransactionStoreBox};
use paybridge::domain::request::PaymentRequest;
use paybridge::domain::scope::Scope;
use paybridge::infrastructure::directory::StaticAccountDirectory;
use paybridge::infrastructure::in_memory::{InMemorySourceStore, InMemoryTransactionStore};
use paybridge::infrastructure::sandbox::SandboxGateway;
use paybridge::interfaces::csv::ledger_writer::LedgerWriter;
use paybridge::interfaces::csv::request_reader::RequestReader;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV file of payment requests to replay
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML file with adapter settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file of account_id,tenant_id,external_key rows for customer descriptions
    #[arg(long)]
    accounts: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<(SourceStoreBox, TransactionStoreBox)> {
    use paybridge::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok((Box::new(store.clone()), Box::new(store)))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<(SourceStoreBox, TransactionStoreBox)> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (SourceStoreBox, TransactionStoreBox) {
    (
        Box::new(InMemorySourceStore::new()),
        Box::new(InMemoryTransactionStore::new()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AdapterConfig::load(path).into_diagnostic()?,
        None => AdapterConfig::default(),
    };
    let directory = match &cli.accounts {
        Some(path) => {
            StaticAccountDirectory::from_csv(File::open(path).into_diagnostic()?)
                .into_diagnostic()?
        }
        None => StaticAccountDirectory::new(),
    };

    let (sources, ledger) = open_stores(cli.db_path)?;
    let engine = ReconciliationEngine::new(
        sources,
        ledger,
        Box::new(SandboxGateway::new()),
        Box::new(directory),
        config,
    );

    // Replay requests, remembering every payment touched
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let mut seen = HashSet::new();
    let mut payments: Vec<PaymentRequest> = Vec::new();
    for request in reader.requests() {
        match request {
            Ok((op, req)) => {
                if let Err(e) = engine.dispatch(op, &req).await {
                    warn!(operation = ?op, error = %e, "Error processing request");
                }
                let key: (Scope, String) = (req.scope(), req.kb_payment_id.clone());
                if op != Operation::AddPaymentMethod
                    && op != Operation::GetPaymentMethodDetail
                    && seen.insert(key)
                {
                    payments.push(req);
                }
            }
            Err(e) => {
                warn!(error = %e, "Error reading request");
            }
        }
    }

    // Output the complete ledger of every payment
    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    for req in &payments {
        let rows = engine.get_payment_info(req).await.into_diagnostic()?;
        writer.write_transactions(&rows).into_diagnostic()?;
    }
    info!(payments = payments.len(), "Replay complete");

    Ok(())
}
