use super::scope::Scope;
use crate::error::PaymentError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire, both for inbound call contexts and projections.
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_wire_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(WIRE_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_wire_timestamp(s: &str) -> Result<DateTime<Utc>, PaymentError> {
    NaiveDateTime::parse_from_str(s, WIRE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| PaymentError::Validation(format!("Invalid timestamp '{}': {}", s, e)))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PluginProperty {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub is_updatable: bool,
}

impl PluginProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_updatable: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CallContext {
    pub account_id: String,
    pub tenant_id: String,
    pub created_date: String,
}

impl CallContext {
    pub fn created_at(&self) -> Result<DateTime<Utc>, PaymentError> {
        parse_wire_timestamp(&self.created_date)
    }
}

/// A normalized payment request as received from the billing orchestrator.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PaymentRequest {
    pub kb_account_id: String,
    pub kb_payment_id: String,
    pub kb_transaction_id: String,
    pub kb_payment_method_id: String,
    /// Decimal amount in major units, e.g. "10" or "12.50".
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub properties: Vec<PluginProperty>,
    pub context: CallContext,
}

impl PaymentRequest {
    pub fn scope(&self) -> Scope {
        Scope::new(self.kb_account_id.clone(), self.context.tenant_id.clone())
    }

    /// Looks up a non-empty plugin property by key.
    pub fn find_property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key && !p.value.is_empty())
            .map(|p| p.value.as_str())
    }
}
