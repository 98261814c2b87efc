//! Domain types and the ports the reconciliation engine is wired against.

pub mod gateway;
pub mod money;
pub mod ports;
pub mod projection;
pub mod request;
pub mod scope;
pub mod source;
pub mod status;
pub mod transaction;
