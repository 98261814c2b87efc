use super::scope::Scope;
use super::status::PluginStatus;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Authorize,
    Purchase,
    Capture,
    Refund,
    Void,
    Credit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorize => "AUTHORIZE",
            Self::Purchase => "PURCHASE",
            Self::Capture => "CAPTURE",
            Self::Refund => "REFUND",
            Self::Void => "VOID",
            Self::Credit => "CREDIT",
        }
    }

    /// Whether this type opens a payment (as opposed to acting on a prior charge).
    pub fn is_initial(self) -> bool {
        matches!(self, Self::Authorize | Self::Purchase)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AUTHORIZE" => Ok(Self::Authorize),
            "PURCHASE" => Ok(Self::Purchase),
            "CAPTURE" => Ok(Self::Capture),
            "REFUND" => Ok(Self::Refund),
            "VOID" => Ok(Self::Void),
            "CREDIT" => Ok(Self::Credit),
            other => Err(PaymentError::Validation(format!(
                "Unknown transaction type: {}",
                other
            ))),
        }
    }
}

/// One row of the ledger: a single attempted gateway operation.
///
/// Rows are immutable once appended; corrections are written as new rows.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    /// Assigned by the store on append. Zero until then.
    pub id: u64,
    pub scope: Scope,
    pub kb_payment_id: String,
    pub kb_transaction_id: String,
    pub r#type: TransactionType,
    pub status: PluginStatus,
    /// The gateway's identifier for the charge or refund. Empty when the gateway was not reached.
    pub gateway_reference: String,
    /// Amount in integer minor units.
    pub amount: i64,
    pub currency: String,
    /// Gateway or engine error text, empty on success.
    pub gateway_error: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!(
            "authorize".parse::<TransactionType>().unwrap(),
            TransactionType::Authorize
        );
        assert_eq!(
            "REFUND".parse::<TransactionType>().unwrap(),
            TransactionType::Refund
        );
        assert!(matches!(
            "chargeback".parse::<TransactionType>(),
            Err(PaymentError::Validation(_))
        ));
    }

    #[test]
    fn test_only_auth_and_purchase_are_initial() {
        assert!(TransactionType::Authorize.is_initial());
        assert!(TransactionType::Purchase.is_initial());
        assert!(!TransactionType::Capture.is_initial());
        assert!(!TransactionType::Void.is_initial());
    }
}
