use super::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Association between a caller's payment method and the gateway's customer/source pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentSource {
    /// Assigned by the store on save; only used for diagnostics.
    pub id: u64,
    pub scope: Scope,
    pub kb_payment_method_id: String,
    pub gateway_source_id: String,
    pub gateway_customer_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}
