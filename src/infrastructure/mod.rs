//! Storage backends implementing the domain ports.
//!
//! All coordination lives here: atomic multi-row commit for ledger postings,
//! compare-and-swap for intent updates, insert-if-absent for idempotency
//! records. The services above hold no locks of their own.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
