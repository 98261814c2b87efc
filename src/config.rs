use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ACCOUNT_LOOKUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PENDING_PAYMENT_EXPIRATION_SECS: u64 = 3 * 24 * 60 * 60;
pub const DEFAULT_CHARGE_DESCRIPTION: &str = "Kill Bill charge";
pub const DEFAULT_TOKEN_PROPERTY: &str = "stripeToken";
pub const DEFAULT_LEGACY_TOKEN_PROPERTY: &str = "token";
pub const DEFAULT_CUSTOMER_PROPERTY: &str = "stripeCustomerId";

/// Gateways cap descriptors at this many characters.
const MAX_DESCRIPTOR_LEN: usize = 22;

/// Runtime settings for the adapter.
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Bounded wait for the orchestrator's account lookup.
    pub account_lookup_timeout_secs: u64,
    /// Age after which a pending initial charge is reported canceled. Zero disables expiry.
    pub pending_payment_expiration_secs: u64,
    pub charge_description: String,
    pub charge_statement_descriptor: String,
    pub token_property: String,
    /// Older orchestrators send the token under this key.
    pub legacy_token_property: String,
    /// Property carrying an existing gateway customer id; when present no customer is created.
    pub customer_property: String,
    /// Serialize operations that target the same payment.
    pub serialize_payments: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            account_lookup_timeout_secs: DEFAULT_ACCOUNT_LOOKUP_TIMEOUT_SECS,
            pending_payment_expiration_secs: DEFAULT_PENDING_PAYMENT_EXPIRATION_SECS,
            charge_description: DEFAULT_CHARGE_DESCRIPTION.to_string(),
            charge_statement_descriptor: DEFAULT_CHARGE_DESCRIPTION.to_string(),
            token_property: DEFAULT_TOKEN_PROPERTY.to_string(),
            legacy_token_property: DEFAULT_LEGACY_TOKEN_PROPERTY.to_string(),
            customer_property: DEFAULT_CUSTOMER_PROPERTY.to_string(),
            serialize_payments: true,
        }
    }
}

impl AdapterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PaymentError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn account_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.account_lookup_timeout_secs)
    }

    pub fn pending_payment_expiration(&self) -> Option<chrono::Duration> {
        if self.pending_payment_expiration_secs == 0 {
            return None;
        }
        i64::try_from(self.pending_payment_expiration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn charge_description(&self) -> String {
        truncate_descriptor(&self.charge_description)
    }

    pub fn charge_statement_descriptor(&self) -> String {
        truncate_descriptor(&self.charge_statement_descriptor)
    }
}

fn truncate_descriptor(value: &str) -> String {
    if value.chars().count() <= MAX_DESCRIPTOR_LEN {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(MAX_DESCRIPTOR_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}
