//! Application layer: the services composing the storage ports into the
//! core operations.
//!
//! The ledger and payment services never call each other; a caller pairs a
//! successful state change with the matching ledger posting.

pub mod idempotency;
pub mod ledger;
pub mod payments;
