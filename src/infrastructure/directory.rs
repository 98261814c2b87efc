use crate::domain::ports::AccountDirectory;
use crate::domain::request::CallContext;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AccountRecord {
    account_id: String,
    tenant_id: String,
    external_key: String,
}

/// Account directory backed by a fixed table of `(account, tenant) → external key`.
#[derive(Debug, Default, Clone)]
pub struct StaticAccountDirectory {
    keys: HashMap<(String, String), String>,
}

impl StaticAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(
        mut self,
        account_id: impl Into<String>,
        tenant_id: impl Into<String>,
        external_key: impl Into<String>,
    ) -> Self {
        self.keys
            .insert((account_id.into(), tenant_id.into()), external_key.into());
        self
    }

    /// Loads `account_id,tenant_id,external_key` rows from CSV.
    pub fn from_csv<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut directory = Self::new();
        for record in reader.deserialize() {
            let record: AccountRecord = record.map_err(PaymentError::from)?;
            directory = directory.with_account(
                record.account_id,
                record.tenant_id,
                record.external_key,
            );
        }
        Ok(directory)
    }
}

#[async_trait]
impl AccountDirectory for StaticAccountDirectory {
    async fn external_key(
        &self,
        account_id: &str,
        context: &CallContext,
    ) -> Result<Option<String>> {
        Ok(self
            .keys
            .get(&(account_id.to_string(), context.tenant_id.clone()))
            .cloned())
    }
}
