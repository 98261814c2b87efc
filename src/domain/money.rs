use crate::error::PaymentError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// Number of minor units in one major unit. Applied to every currency alike.
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// A positive monetary amount in major units, as supplied by the orchestrator.
///
/// Converts to and from the integer minor units stored in the ledger. The conversion is
/// the same for every currency: multiply by 100 and truncate on the way in, divide by
/// 100 exactly on the way out. Zero-decimal currencies are not special-cased.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn from_minor_units(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }

    pub fn to_minor_units(&self) -> Result<i64, PaymentError> {
        self.0
            .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
            .and_then(|scaled| scaled.trunc().to_i64())
            .ok_or_else(|| {
                PaymentError::Validation(format!("Amount {} is out of range", self.0))
            })
    }
}

impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| PaymentError::Validation(format!("Invalid amount '{}': {}", s, e)))?;
        Self::new(value)
    }
}
