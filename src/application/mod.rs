//! Application layer containing the reconciliation logic.
//!
//! This module defines the `ReconciliationEngine`, the single entry point for payment
//! operations. It composes the domain ports and owns the per-payment locks and the pending
//! payment expiry policy.

pub mod engine;
pub mod expiry;
pub mod locks;
