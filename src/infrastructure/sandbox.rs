use crate::domain::gateway::{ChargeParams, ChargeResult, RefundResult};
use crate::domain::ports::GatewayClient;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Token whose charges are always declined.
pub const DECLINED_TOKEN: &str = "tok_chargeDeclined";
/// Token whose charges stay pending.
pub const PENDING_TOKEN: &str = "tok_pending";

#[derive(Debug, Clone)]
struct Card {
    customer: String,
    token: String,
}

#[derive(Debug, Clone)]
struct Charge {
    amount: i64,
    currency: String,
    status: &'static str,
    captured: bool,
    refunded: bool,
}

#[derive(Default)]
struct Ledger {
    sequence: u64,
    customers: HashMap<String, Option<String>>,
    cards: HashMap<String, Card>,
    charges: HashMap<String, Charge>,
}

impl Ledger {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{}_{}", prefix, self.sequence)
    }
}

/// A deterministic in-process gateway with test-mode token semantics.
///
/// Tokens must look like `tok_*`. [`DECLINED_TOKEN`] makes charges fail and
/// [`PENDING_TOKEN`] leaves them pending; anything else succeeds.
#[derive(Clone)]
pub struct SandboxGateway {
    state: Arc<Mutex<Ledger>>,
    available: Arc<AtomicBool>,
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every call fails with [`GatewayError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), GatewayError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unavailable("sandbox is offline".to_string()))
        }
    }

    /// Description the customer was created with, if the customer exists.
    pub async fn customer_description(&self, customer_id: &str) -> Option<Option<String>> {
        self.state.lock().await.customers.get(customer_id).cloned()
    }
}

fn charge_result(id: &str, charge: &Charge) -> ChargeResult {
    ChargeResult {
        id: id.to_string(),
        amount: charge.amount,
        currency: charge.currency.clone(),
        status: charge.status.to_string(),
    }
}

#[async_trait]
impl GatewayClient for SandboxGateway {
    async fn charge(&self, params: ChargeParams) -> Result<ChargeResult, GatewayError> {
        self.ensure_available()?;
        if params.amount <= 0 {
            return Err(GatewayError::InvalidRequest(
                "Amount must be at least 1 minor unit".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let card = state
            .cards
            .get(&params.source)
            .filter(|card| card.customer == params.customer)
            .cloned()
            .ok_or_else(|| {
                GatewayError::InvalidRequest(format!("No such source: '{}'", params.source))
            })?;

        if card.token == DECLINED_TOKEN {
            return Err(GatewayError::CardDeclined(
                "Your card was declined.".to_string(),
            ));
        }

        let status = if card.token == PENDING_TOKEN {
            "pending"
        } else {
            "succeeded"
        };
        let id = state.next_id("ch");
        let charge = Charge {
            amount: params.amount,
            currency: params.currency.to_lowercase(),
            status,
            captured: params.capture,
            refunded: false,
        };
        let result = charge_result(&id, &charge);
        state.charges.insert(id, charge);

        Ok(result)
    }

    async fn capture(&self, reference: &str) -> Result<ChargeResult, GatewayError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let charge = state.charges.get_mut(reference).ok_or_else(|| {
            GatewayError::InvalidRequest(format!("No such charge: '{}'", reference))
        })?;

        if charge.captured {
            return Err(GatewayError::InvalidRequest(format!(
                "Charge {} has already been captured.",
                reference
            )));
        }
        if charge.refunded {
            return Err(GatewayError::InvalidRequest(format!(
                "Charge {} has been refunded.",
                reference
            )));
        }

        charge.captured = true;
        charge.status = "succeeded";
        Ok(charge_result(reference, charge))
    }

    async fn refund(&self, reference: &str) -> Result<RefundResult, GatewayError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let (amount, currency) = {
            let charge = state.charges.get_mut(reference).ok_or_else(|| {
                GatewayError::InvalidRequest(format!("No such charge: '{}'", reference))
            })?;
            if charge.refunded {
                return Err(GatewayError::InvalidRequest(format!(
                    "Charge {} has already been refunded.",
                    reference
                )));
            }
            charge.refunded = true;
            (charge.amount, charge.currency.clone())
        };

        Ok(RefundResult {
            id: state.next_id("re"),
            charge: reference.to_string(),
            amount,
            currency,
            status: "succeeded".to_string(),
        })
    }

    async fn create_customer(&self, description: Option<&str>) -> Result<String, GatewayError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let id = state.next_id("cus");
        state
            .customers
            .insert(id.clone(), description.map(str::to_string));
        Ok(id)
    }

    async fn attach_source(&self, customer_id: &str, token: &str) -> Result<String, GatewayError> {
        self.ensure_available()?;
        if !token.starts_with("tok_") {
            return Err(GatewayError::InvalidRequest(format!(
                "No such token: '{}'",
                token
            )));
        }

        let mut state = self.state.lock().await;
        if !state.customers.contains_key(customer_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "No such customer: '{}'",
                customer_id
            )));
        }

        let id = state.next_id("card");
        state.cards.insert(
            id.clone(),
            Card {
                customer: customer_id.to_string(),
                token: token.to_string(),
            },
        );
        Ok(id)
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.ensure_available()
    }
}
