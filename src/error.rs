use thiserror::Error;

use crate::domain::payment::PaymentState;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Closed set of failure kinds surfaced by the core.
///
/// Validation kinds are detected before any write; conflict kinds
/// (`VersionMismatch`, `AlreadyExists`, `ConflictingKeyReuse`) are surfaced
/// distinctly so callers can decide whether to re-read and retry; not-found
/// kinds distinguish a bad reference from a bad request.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transaction does not balance to zero")]
    UnbalancedTransaction,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("invalid currency")]
    InvalidCurrency,
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentState,
        to: PaymentState,
    },
    #[error("version mismatch: concurrent modification detected")]
    VersionMismatch,
    #[error("amount {requested} exceeds intent amount {limit}")]
    AmountExceeded { requested: i64, limit: i64 },
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error("transaction {0} not found")]
    TransactionNotFound(String),
    #[error("payment intent {0} not found")]
    IntentNotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("idempotency key reused with a different request payload")]
    ConflictingKeyReuse,
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}
