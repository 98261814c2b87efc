use serde::{Deserialize, Serialize};

/// Tenant-scoped identity carried by every stored entity.
///
/// Stores filter on both fields together; an account id alone never identifies a row.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
pub struct Scope {
    pub account_id: String,
    pub tenant_id: String,
}

impl Scope {
    pub fn new(account_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}
