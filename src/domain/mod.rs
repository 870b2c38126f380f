//! Domain layer: data model, validation rules, the payment state machine,
//! and the storage capability contracts.

pub mod idempotency;
pub mod ledger;
pub mod payment;
pub mod ports;
