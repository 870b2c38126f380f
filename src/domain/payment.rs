use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Created,
    Authorized,
    Captured,
    Failed,
    Refunded,
}

impl PaymentState {
    pub const ALL: [PaymentState; 5] = [
        PaymentState::Created,
        PaymentState::Authorized,
        PaymentState::Captured,
        PaymentState::Failed,
        PaymentState::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentState::Created => "CREATED",
            PaymentState::Authorized => "AUTHORIZED",
            PaymentState::Captured => "CAPTURED",
            PaymentState::Failed => "FAILED",
            PaymentState::Refunded => "REFUNDED",
        }
    }

    /// A terminal state has no outgoing edges in the transition table.
    pub fn is_terminal(self) -> bool {
        ALLOWED_TRANSITIONS.iter().all(|(from, _)| *from != self)
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete set of legal state transitions. Built once, never mutated;
/// every pair outside this table is rejected.
pub const ALLOWED_TRANSITIONS: [(PaymentState, PaymentState); 5] = [
    (PaymentState::Created, PaymentState::Authorized),
    (PaymentState::Created, PaymentState::Failed),
    (PaymentState::Authorized, PaymentState::Captured),
    (PaymentState::Authorized, PaymentState::Failed),
    (PaymentState::Captured, PaymentState::Refunded),
];

pub fn can_transition(from: PaymentState, to: PaymentState) -> bool {
    ALLOWED_TRANSITIONS.contains(&(from, to))
}

pub fn validate_transition(from: PaymentState, to: PaymentState) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(PaymentError::InvalidTransition { from, to })
    }
}

/// A merchant's request to move money, tracked through its lifecycle.
///
/// Mutated only through the store's compare-and-swap update; `version`
/// increments by exactly one on every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub merchant_id: String,
    /// Original intent amount in minor currency units, always positive.
    pub amount: i64,
    pub currency: String,
    pub state: PaymentState,
    pub version: i64,
    pub idempotency_key: Option<String>,
    pub selected_provider: Option<String>,
    pub provider_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    pub merchant_id: String,
    pub amount: i64,
    pub currency: String,
    pub idempotency_key: Option<String>,
}

impl CreateIntentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.merchant_id.is_empty() {
            return Err(PaymentError::Validation(
                "merchant id is required".to_string(),
            ));
        }
        if self.amount <= 0 {
            return Err(PaymentError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if self.currency.is_empty() {
            return Err(PaymentError::Validation(
                "currency is required".to_string(),
            ));
        }
        Ok(())
    }
}
