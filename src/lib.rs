//! Money-movement core for a payment platform.
//!
//! Tracks the lifecycle of a payment (create, authorize, capture, refund)
//! and records the corresponding double-entry bookkeeping transactions,
//! which always net to zero. Concurrent mutations of the same intent are
//! resolved by optimistic versioning, retried requests are deduplicated by
//! idempotency key, and posted transactions are immutable.

pub mod application;
pub mod domain;
pub mod error;
pub mod id;
pub mod infrastructure;
