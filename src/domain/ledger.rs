use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Asset,
    Liability,
    Revenue,
    Expense,
}

/// Reference data for a ledger account. Created once, never mutated by the
/// core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header row of a posted double-entry transaction. Immutable once committed:
/// a transaction id is never associated with a different entry set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One leg of a double-entry transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub transaction_id: String,
    /// Position within the transaction, 0-based, preserving request order.
    pub entry_index: usize,
    pub account_id: String,
    /// Signed amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub account_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTransactionRequest {
    pub transaction_id: String,
    pub description: String,
    pub entries: Vec<EntryRequest>,
}

impl PostTransactionRequest {
    pub fn is_balanced(&self) -> bool {
        self.entries.iter().map(|entry| entry.amount).sum::<i64>() == 0
    }

    /// Checks the whole request before anything is written; the first
    /// violation is reported.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.is_empty() {
            return Err(PaymentError::Validation(
                "transaction id is required".to_string(),
            ));
        }
        if self.description.is_empty() {
            return Err(PaymentError::Validation(
                "description is required".to_string(),
            ));
        }
        if self.entries.len() < 2 {
            return Err(PaymentError::Validation(
                "double-entry requires at least two entries".to_string(),
            ));
        }
        if !self.is_balanced() {
            return Err(PaymentError::UnbalancedTransaction);
        }
        for entry in &self.entries {
            if entry.account_id.is_empty() {
                return Err(PaymentError::Validation(
                    "account id is required".to_string(),
                ));
            }
            if entry.amount == 0 {
                return Err(PaymentError::InvalidAmount);
            }
            if entry.currency.is_empty() {
                return Err(PaymentError::InvalidCurrency);
            }
        }
        Ok(())
    }
}
