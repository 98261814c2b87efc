//! Response shapes returned to the orchestrator and the projections that build them.

use super::money::Amount;
use super::request::{PluginProperty, format_wire_timestamp};
use super::source::PaymentSource;
use super::status::PluginStatus;
use super::transaction::{Transaction, TransactionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CUSTOMER_ID_PROPERTY: &str = "stripeCustomerId";
pub const SOURCE_RECORD_ID_PROPERTY: &str = "stripePaymentMethodsId";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionInfo {
    pub kb_payment_id: String,
    pub kb_transaction_payment_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub currency: String,
    pub created_date: String,
    pub effective_date: String,
    pub status: PluginStatus,
    pub gateway_error: String,
    pub gateway_error_code: String,
    pub first_payment_reference_id: String,
}

impl From<&Transaction> for TransactionInfo {
    fn from(tx: &Transaction) -> Self {
        let timestamp = format_wire_timestamp(&tx.created_at);
        Self {
            kb_payment_id: tx.kb_payment_id.clone(),
            kb_transaction_payment_id: tx.kb_transaction_id.clone(),
            transaction_type: tx.r#type,
            amount: Amount::from_minor_units(tx.amount),
            currency: tx.currency.to_uppercase(),
            created_date: timestamp.clone(),
            effective_date: timestamp,
            status: tx.status,
            gateway_error: tx.gateway_error.clone(),
            gateway_error_code: String::new(),
            first_payment_reference_id: tx.gateway_reference.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethodInfo {
    pub kb_payment_method_id: String,
    pub external_payment_method_id: String,
    pub is_default_payment_method: bool,
    pub properties: Vec<PluginProperty>,
}

impl From<&PaymentSource> for PaymentMethodInfo {
    fn from(source: &PaymentSource) -> Self {
        Self {
            kb_payment_method_id: source.kb_payment_method_id.clone(),
            external_payment_method_id: source.gateway_source_id.clone(),
            is_default_payment_method: false,
            properties: vec![
                PluginProperty::new(CUSTOMER_ID_PROPERTY, source.gateway_customer_id.clone()),
                PluginProperty::new(SOURCE_RECORD_ID_PROPERTY, source.id.to_string()),
            ],
        }
    }
}
