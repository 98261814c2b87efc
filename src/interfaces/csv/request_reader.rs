use crate::application::engine::Operation;
use crate::domain::request::{CallContext, PaymentRequest, PluginProperty};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One line of a replay file.
///
/// `properties` holds `key=value` pairs separated by `;`.
#[derive(Debug, Deserialize)]
struct RequestRecord {
    operation: String,
    account_id: String,
    tenant_id: String,
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    transaction_id: String,
    #[serde(default)]
    payment_method_id: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    currency: String,
    created_date: String,
    #[serde(default)]
    properties: String,
}

fn parse_properties(raw: &str) -> Result<Vec<PluginProperty>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| PluginProperty::new(key.trim(), value.trim()))
                .ok_or_else(|| {
                    PaymentError::Validation(format!("Malformed property '{}'", entry))
                })
        })
        .collect()
}

impl RequestRecord {
    fn into_request(self) -> Result<(Operation, PaymentRequest)> {
        let operation = self.operation.parse()?;
        let request = PaymentRequest {
            kb_account_id: self.account_id.clone(),
            kb_payment_id: self.payment_id,
            kb_transaction_id: self.transaction_id,
            kb_payment_method_id: self.payment_method_id,
            amount: self.amount,
            currency: self.currency,
            properties: parse_properties(&self.properties)?,
            context: CallContext {
                account_id: self.account_id,
                tenant_id: self.tenant_id,
                created_date: self.created_date,
            },
        };
        Ok((operation, request))
    }
}

/// Reads payment requests from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<(Operation, PaymentRequest)>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts requests.
    pub fn requests(self) -> impl Iterator<Item = Result<(Operation, PaymentRequest)>> {
        self.reader.into_deserialize().map(|result| {
            let record: RequestRecord = result.map_err(PaymentError::from)?;
            record.into_request()
        })
    }
}
