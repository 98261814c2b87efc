use super::expiry::ExpiryPolicy;
use super::locks::PaymentLocks;
use crate::config::AdapterConfig;
use crate::domain::gateway::{ChargeParams, ChargeResult, RefundResult};
use crate::domain::money::Amount;
use crate::domain::ports::{
    AccountDirectoryBox, ClockBox, GatewayClientBox, SourceStoreBox, SystemClock,
    TransactionStoreBox,
};
use crate::domain::projection::{PaymentMethodInfo, TransactionInfo};
use crate::domain::request::PaymentRequest;
use crate::domain::scope::Scope;
use crate::domain::source::PaymentSource;
use crate::domain::status::{PluginStatus, normalize};
use crate::domain::transaction::{Transaction, TransactionType};
use crate::error::{GatewayError, PaymentError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

pub const UNSUPPORTED_OPERATION: &str = "unsupported operation";
pub const PAYMENT_EXPIRED: &str = "payment expired";

/// What came back from one gateway attempt, before normalization.
///
/// A fault before or during the call is captured as `error`; it never short-circuits the
/// ledger write.
#[derive(Debug)]
struct Outcome {
    reference: String,
    amount: i64,
    currency: String,
    gateway_status: String,
    error: Option<String>,
}

impl Outcome {
    fn aborted(amount: i64, currency: &str, error: impl fmt::Display) -> Self {
        Self {
            reference: String::new(),
            amount,
            currency: currency.to_string(),
            gateway_status: "canceled".to_string(),
            error: Some(error.to_string()),
        }
    }

    fn from_charge(
        result: std::result::Result<ChargeResult, GatewayError>,
        amount: i64,
        currency: &str,
    ) -> Self {
        match result {
            Ok(charge) => Self {
                reference: charge.id,
                amount: charge.amount,
                currency: charge.currency,
                gateway_status: charge.status,
                error: None,
            },
            Err(err) => Self::aborted(amount, currency, err),
        }
    }

    fn from_refund(
        result: std::result::Result<RefundResult, GatewayError>,
        amount: i64,
        currency: &str,
    ) -> Self {
        match result {
            Ok(refund) => Self {
                reference: refund.id,
                amount: refund.amount,
                currency: refund.currency,
                gateway_status: refund.status,
                error: None,
            },
            Err(err) => Self::aborted(amount, currency, err),
        }
    }

    fn status(&self) -> PluginStatus {
        normalize(&self.gateway_status, self.error.as_deref())
    }
}

/// Inbound operations understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authorize,
    Purchase,
    Capture,
    Refund,
    Void,
    Credit,
    GetPaymentInfo,
    AddPaymentMethod,
    GetPaymentMethodDetail,
}

impl FromStr for Operation {
    type Err = PaymentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        match normalized.as_str() {
            "authorize" => Ok(Self::Authorize),
            "purchase" => Ok(Self::Purchase),
            "capture" => Ok(Self::Capture),
            "refund" => Ok(Self::Refund),
            "void" => Ok(Self::Void),
            "credit" => Ok(Self::Credit),
            "getpaymentinfo" => Ok(Self::GetPaymentInfo),
            "addpaymentmethod" => Ok(Self::AddPaymentMethod),
            "getpaymentmethoddetail" => Ok(Self::GetPaymentMethodDetail),
            other => Err(PaymentError::Validation(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

/// Result of [`ReconciliationEngine::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Transaction(TransactionInfo),
    Transactions(Vec<TransactionInfo>),
    PaymentMethod(PaymentMethodInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

/// Drives gateway operations and records every attempt in the ledger.
///
/// `ReconciliationEngine` is stateless between requests apart from the injected stores,
/// gateway handle and per-payment locks. Each operation resolves its inputs, calls the
/// gateway once, normalizes the outcome and appends exactly one ledger row, even when
/// resolution or the gateway call fails.
pub struct ReconciliationEngine {
    sources: SourceStoreBox,
    ledger: TransactionStoreBox,
    gateway: GatewayClientBox,
    accounts: AccountDirectoryBox,
    clock: ClockBox,
    config: AdapterConfig,
    expiry: ExpiryPolicy,
    locks: PaymentLocks,
}

impl ReconciliationEngine {
    /// Creates a new `ReconciliationEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `sources` - The store for payment sources.
    /// * `ledger` - The append-only transaction store.
    /// * `gateway` - The card-processing gateway client.
    /// * `accounts` - Lookup used to describe newly created gateway customers.
    /// * `config` - Adapter settings.
    pub fn new(
        sources: SourceStoreBox,
        ledger: TransactionStoreBox,
        gateway: GatewayClientBox,
        accounts: AccountDirectoryBox,
        config: AdapterConfig,
    ) -> Self {
        Self {
            sources,
            ledger,
            gateway,
            accounts,
            clock: Box::new(SystemClock),
            expiry: ExpiryPolicy::new(config.pending_payment_expiration()),
            config,
            locks: PaymentLocks::new(),
        }
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    pub async fn dispatch(&self, op: Operation, req: &PaymentRequest) -> Result<Response> {
        match op {
            Operation::Authorize => self.authorize(req).await.map(Response::Transaction),
            Operation::Purchase => self.purchase(req).await.map(Response::Transaction),
            Operation::Capture => self.capture(req).await.map(Response::Transaction),
            Operation::Refund => self.refund(req).await.map(Response::Transaction),
            Operation::Void => self.void(req).await.map(Response::Transaction),
            Operation::Credit => self.credit(req).await.map(Response::Transaction),
            Operation::GetPaymentInfo => {
                self.get_payment_info(req).await.map(Response::Transactions)
            }
            Operation::AddPaymentMethod => {
                self.add_payment_method(req).await.map(Response::PaymentMethod)
            }
            Operation::GetPaymentMethodDetail => self
                .get_payment_method_detail(req)
                .await
                .map(Response::PaymentMethod),
        }
    }

    pub async fn authorize(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.charge(req, TransactionType::Authorize).await
    }

    pub async fn purchase(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.charge(req, TransactionType::Purchase).await
    }

    /// Captures the charge referenced by the payment's latest ledger row.
    pub async fn capture(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.follow_on(req, TransactionType::Capture).await
    }

    /// Refunds the charge referenced by the payment's latest ledger row.
    pub async fn refund(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.follow_on(req, TransactionType::Refund).await
    }

    pub async fn void(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.unsupported(req, TransactionType::Void).await
    }

    pub async fn credit(&self, req: &PaymentRequest) -> Result<TransactionInfo> {
        self.unsupported(req, TransactionType::Credit).await
    }

    /// Returns the complete ledger for the payment, oldest first.
    ///
    /// An expired pending charge gets a CANCELED correction row appended first.
    pub async fn get_payment_info(&self, req: &PaymentRequest) -> Result<Vec<TransactionInfo>> {
        let scope = req.scope();
        let _guard = self.lock(&scope, &req.kb_payment_id).await;

        let mut ledger = self
            .ledger
            .list_by_payment(&req.kb_payment_id, &scope)
            .await?;

        let now = self.clock.now();
        if let Some(expired) = self.expiry.expired(&ledger, now) {
            warn!(
                kb_payment_id = %req.kb_payment_id,
                reference = %expired.gateway_reference,
                "Pending payment expired, recording cancellation"
            );
            let correction = Transaction {
                id: 0,
                status: PluginStatus::Canceled,
                gateway_error: PAYMENT_EXPIRED.to_string(),
                created_at: now,
                ..expired.clone()
            };
            let stored = self.ledger.append(correction).await?;
            ledger.push(stored);
        }

        Ok(ledger.iter().map(TransactionInfo::from).collect())
    }

    /// Registers a gateway source for the caller's payment method.
    ///
    /// Gateway failures here propagate: there is no ledger row to fold them into.
    pub async fn add_payment_method(&self, req: &PaymentRequest) -> Result<PaymentMethodInfo> {
        let created_at = req.context.created_at()?;
        let token = req
            .find_property(&self.config.token_property)
            .or_else(|| req.find_property(&self.config.legacy_token_property))
            .ok_or_else(|| {
                PaymentError::Validation(format!(
                    "Missing '{}' property",
                    self.config.token_property
                ))
            })?;

        let customer_id = match req.find_property(&self.config.customer_property) {
            Some(customer_id) => customer_id.to_string(),
            None => {
                let description = self.external_key(req).await;
                self.gateway.create_customer(description.as_deref()).await?
            }
        };

        let gateway_source_id = self.gateway.attach_source(&customer_id, token).await?;

        let source = self
            .sources
            .save(PaymentSource {
                id: 0,
                scope: req.scope(),
                kb_payment_method_id: req.kb_payment_method_id.clone(),
                gateway_source_id,
                gateway_customer_id: customer_id,
                created_at,
                is_deleted: false,
            })
            .await?;

        info!(
            kb_payment_method_id = %source.kb_payment_method_id,
            source_id = source.id,
            "Payment source registered"
        );
        Ok(PaymentMethodInfo::from(&source))
    }

    pub async fn get_payment_method_detail(
        &self,
        req: &PaymentRequest,
    ) -> Result<PaymentMethodInfo> {
        let source = self
            .sources
            .find(&req.kb_payment_method_id, &req.scope())
            .await?;
        Ok(PaymentMethodInfo::from(&source))
    }

    pub async fn health(&self) -> HealthStatus {
        match self.gateway.ping().await {
            Ok(()) => HealthStatus {
                healthy: true,
                message: "Gateway OK".to_string(),
            },
            Err(err) => {
                warn!(error = %err, "Healthcheck error");
                HealthStatus {
                    healthy: false,
                    message: format!("Gateway error: {}", err),
                }
            }
        }
    }

    async fn charge(&self, req: &PaymentRequest, kind: TransactionType) -> Result<TransactionInfo> {
        let (created_at, invalid_date) = self.created_at(req);
        let scope = req.scope();
        let _guard = self.lock(&scope, &req.kb_payment_id).await;

        let amount = requested_minor_units(req);
        let params = match invalid_date {
            Some(err) => Err(err),
            None => self.charge_params(req, &scope, kind).await,
        };
        let outcome = match params {
            Ok(params) => {
                Outcome::from_charge(self.gateway.charge(params).await, amount, &req.currency)
            }
            Err(err) => {
                warn!(
                    kb_payment_id = %req.kb_payment_id,
                    error = %err,
                    "Skipping gateway charge"
                );
                Outcome::aborted(amount, &req.currency, err)
            }
        };

        self.record(req, kind, created_at, outcome).await
    }

    /// Capture or refund against the payment's latest gateway reference.
    async fn follow_on(
        &self,
        req: &PaymentRequest,
        kind: TransactionType,
    ) -> Result<TransactionInfo> {
        let (created_at, invalid_date) = self.created_at(req);
        let scope = req.scope();
        let _guard = self.lock(&scope, &req.kb_payment_id).await;

        let amount = requested_minor_units(req);
        let target = match invalid_date {
            Some(err) => Err(err),
            None => self.target_reference(req, &scope).await,
        };
        let outcome = match target {
            Ok(reference) if kind == TransactionType::Refund => Outcome::from_refund(
                self.gateway.refund(&reference).await,
                amount,
                &req.currency,
            ),
            Ok(reference) => Outcome::from_charge(
                self.gateway.capture(&reference).await,
                amount,
                &req.currency,
            ),
            Err(err) => Outcome::aborted(amount, &req.currency, err),
        };

        self.record(req, kind, created_at, outcome).await
    }

    async fn charge_params(
        &self,
        req: &PaymentRequest,
        scope: &Scope,
        kind: TransactionType,
    ) -> Result<ChargeParams> {
        let source = self.sources.find(&req.kb_payment_method_id, scope).await?;
        let amount = req.amount.parse::<Amount>()?.to_minor_units()?;

        Ok(ChargeParams {
            amount,
            currency: req.currency.clone(),
            customer: source.gateway_customer_id,
            source: source.gateway_source_id,
            capture: kind == TransactionType::Purchase,
            description: self.config.charge_description(),
            statement_descriptor: self.config.charge_statement_descriptor(),
        })
    }

    /// Gateway reference of the latest ledger row, or an empty reference for an empty ledger.
    async fn target_reference(&self, req: &PaymentRequest, scope: &Scope) -> Result<String> {
        let latest = self
            .ledger
            .latest_by_payment(&req.kb_payment_id, scope)
            .await?;

        match latest {
            Some(tx) => Ok(tx.gateway_reference),
            None => {
                debug!(kb_payment_id = %req.kb_payment_id, "No prior transaction to target");
                Ok(String::new())
            }
        }
    }

    async fn unsupported(
        &self,
        req: &PaymentRequest,
        kind: TransactionType,
    ) -> Result<TransactionInfo> {
        let (created_at, _) = self.created_at(req);
        let scope = req.scope();
        let _guard = self.lock(&scope, &req.kb_payment_id).await;

        let outcome = Outcome::aborted(
            requested_minor_units(req),
            &req.currency,
            UNSUPPORTED_OPERATION,
        );
        let info = self.record(req, kind, created_at, outcome).await?;
        Err(PaymentError::unsupported(info))
    }

    /// Appends the ledger row for an attempt and projects it.
    async fn record(
        &self,
        req: &PaymentRequest,
        kind: TransactionType,
        created_at: DateTime<Utc>,
        outcome: Outcome,
    ) -> Result<TransactionInfo> {
        let status = outcome.status();
        let tx = Transaction {
            id: 0,
            scope: req.scope(),
            kb_payment_id: req.kb_payment_id.clone(),
            kb_transaction_id: req.kb_transaction_id.clone(),
            r#type: kind,
            status,
            gateway_reference: outcome.reference,
            amount: outcome.amount,
            currency: outcome.currency,
            gateway_error: outcome.error.unwrap_or_default(),
            created_at,
        };
        let reference = tx.gateway_reference.clone();

        match self.ledger.append(tx).await {
            Ok(stored) => {
                info!(
                    kb_payment_id = %stored.kb_payment_id,
                    transaction_type = %stored.r#type,
                    status = %stored.status,
                    reference = %stored.gateway_reference,
                    "Transaction recorded"
                );
                Ok(TransactionInfo::from(&stored))
            }
            Err(err) if status.may_have_moved_funds() => {
                error!(
                    kb_payment_id = %req.kb_payment_id,
                    reference = %reference,
                    error = %err,
                    "Gateway operation succeeded but the ledger append failed"
                );
                Err(PaymentError::Unrecorded {
                    reference,
                    source: Box::new(err),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// When the request's timestamp is malformed the row is still written, stamped with the
    /// clock's time, and the parse error is handed back for the ledger.
    fn created_at(&self, req: &PaymentRequest) -> (DateTime<Utc>, Option<PaymentError>) {
        match req.context.created_at() {
            Ok(created_at) => (created_at, None),
            Err(err) => {
                warn!(
                    kb_payment_id = %req.kb_payment_id,
                    created_date = %req.context.created_date,
                    "Malformed request timestamp, using current time"
                );
                (self.clock.now(), Some(err))
            }
        }
    }

    async fn external_key(&self, req: &PaymentRequest) -> Option<String> {
        let lookup = self
            .accounts
            .external_key(&req.context.account_id, &req.context);

        match tokio::time::timeout(self.config.account_lookup_timeout(), lookup).await {
            Ok(Ok(Some(key))) => Some(key),
            Ok(Ok(None)) => {
                warn!(account_id = %req.context.account_id, "Unable to retrieve account");
                None
            }
            Ok(Err(err)) => {
                warn!(account_id = %req.context.account_id, error = %err, "Unable to retrieve account");
                None
            }
            Err(_) => {
                warn!(account_id = %req.context.account_id, "Account lookup timed out");
                None
            }
        }
    }

    async fn lock(&self, scope: &Scope, kb_payment_id: &str) -> Option<OwnedMutexGuard<()>> {
        if !self.config.serialize_payments {
            return None;
        }
        Some(self.locks.acquire(scope, kb_payment_id).await)
    }
}

/// The request amount in minor units, or zero when it cannot be converted.
fn requested_minor_units(req: &PaymentRequest) -> i64 {
    req.amount
        .parse::<Amount>()
        .and_then(|amount| amount.to_minor_units())
        .unwrap_or(0)
}
