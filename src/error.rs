use crate::domain::projection::TransactionInfo;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failures reported by the card-processing gateway.
///
/// The engine never lets these escape a payment operation: they are folded into a
/// CANCELED ledger row. Only source registration surfaces them to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("card declined: {0}")]
    CardDeclined(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Unsupported operation: {}", .info.transaction_type)]
    Unsupported { info: Box<TransactionInfo> },
    #[error("Gateway reference {reference} was not recorded in the ledger: {source}")]
    Unrecorded {
        reference: String,
        #[source]
        source: Box<PaymentError>,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PaymentError {
    pub fn unsupported(info: TransactionInfo) -> Self {
        Self::Unsupported {
            info: Box::new(info),
        }
    }

    /// The ledger row that was written before the error was reported, if any.
    pub fn recorded_info(&self) -> Option<&TransactionInfo> {
        match self {
            Self::Unsupported { info } => Some(info),
            _ => None,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization error: {}", err))
    }
}
