use async_trait::async_trait;

use crate::domain::idempotency::IdempotencyRecord;
use crate::domain::ledger::{Account, LedgerEntry, Transaction};
use crate::domain::payment::{PaymentIntent, PaymentState};
use crate::error::Result;

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type IntentStoreBox = Box<dyn IntentStore>;
pub type IdempotencyStoreBox = Box<dyn IdempotencyStore>;

/// Storage contract for the double-entry ledger.
///
/// The store provides atomic multi-row commit: `insert_transaction` either
/// persists the header and every entry, or nothing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(&self, account: Account) -> Result<()>;
    async fn get_account(&self, id: &str) -> Result<Account>;
    /// Most recently created first.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Commits the transaction header and all entries as one atomic unit.
    /// A duplicate transaction id is rejected with `AlreadyExists` and leaves
    /// the stored rows untouched.
    async fn insert_transaction(
        &self,
        transaction: Transaction,
        entries: Vec<LedgerEntry>,
    ) -> Result<()>;
    async fn get_transaction(&self, id: &str) -> Result<Transaction>;
    /// Ordered by `entry_index`.
    async fn entries_by_transaction(&self, transaction_id: &str) -> Result<Vec<LedgerEntry>>;
    /// Most recent entries first.
    async fn entries_by_account(&self, account_id: &str, limit: usize) -> Result<Vec<LedgerEntry>>;
}

/// Storage contract for payment intents.
#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn create(&self, intent: PaymentIntent) -> Result<()>;
    async fn get(&self, id: &str) -> Result<PaymentIntent>;
    async fn get_by_idempotency_key(
        &self,
        merchant_id: &str,
        key: &str,
    ) -> Result<Option<PaymentIntent>>;
    /// Compare-and-swap state update: succeeds only when the stored version
    /// equals `expected_version`, incrementing it by one. Zero rows affected
    /// (missing id or stale version) surfaces as `VersionMismatch`.
    async fn update_state(
        &self,
        id: &str,
        state: PaymentState,
        expected_version: i64,
    ) -> Result<()>;
    /// Same compare-and-swap, additionally recording the provider selected
    /// during authorization.
    async fn update_state_with_provider(
        &self,
        id: &str,
        state: PaymentState,
        provider: &str,
        provider_payment_id: &str,
        expected_version: i64,
    ) -> Result<()>;
    /// Most recently created first.
    async fn list(&self, merchant_id: &str, limit: usize) -> Result<Vec<PaymentIntent>>;
}

/// Storage contract for idempotency records.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Live (non-expired) record for `(merchant_id, key)`, if any.
    async fn get(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>>;
    /// First insert wins; a record already present under the same key is left
    /// untouched.
    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<()>;
}
