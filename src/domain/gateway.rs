//! Values exchanged with the card-processing gateway.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ChargeParams {
    /// Amount in integer minor units.
    pub amount: i64,
    pub currency: String,
    pub customer: String,
    pub source: String,
    /// `true` settles immediately (purchase), `false` only authorizes.
    pub capture: bool,
    pub description: String,
    pub statement_descriptor: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ChargeResult {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RefundResult {
    pub id: String,
    /// The charge this refund was issued against.
    pub charge: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}
