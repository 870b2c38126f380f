use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::idempotency::IdempotencyRecord;
use crate::domain::ledger::{Account, LedgerEntry, Transaction};
use crate::domain::payment::{PaymentIntent, PaymentState};
use crate::domain::ports::{IdempotencyStore, IntentStore, LedgerStore};
use crate::error::{PaymentError, Result};

/// Thread-safe in-memory ledger tables.
///
/// All tables live behind a single `RwLock`: each mutating call holds the
/// write lock for the whole commit, so a posting lands atomically and
/// readers never observe a transaction with only part of its entries.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerTables>>,
}

#[derive(Default)]
struct LedgerTables {
    accounts: HashMap<String, Account>,
    transactions: HashMap<String, Transaction>,
    /// Append-only journal; insertion order doubles as recency order.
    entries: Vec<LedgerEntry>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_account(&self, account: Account) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.accounts.contains_key(&account.id) {
            return Err(PaymentError::AlreadyExists(account.id));
        }
        tables.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn get_account(&self, id: &str) -> Result<Account> {
        let tables = self.inner.read().await;
        tables
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::AccountNotFound(id.to_string()))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let tables = self.inner.read().await;
        let mut accounts: Vec<_> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn insert_transaction(
        &self,
        transaction: Transaction,
        entries: Vec<LedgerEntry>,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.transactions.contains_key(&transaction.id) {
            return Err(PaymentError::AlreadyExists(transaction.id));
        }
        tables
            .transactions
            .insert(transaction.id.clone(), transaction);
        tables.entries.extend(entries);
        Ok(())
    }

    async fn get_transaction(&self, id: &str) -> Result<Transaction> {
        let tables = self.inner.read().await;
        tables
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::TransactionNotFound(id.to_string()))
    }

    async fn entries_by_transaction(&self, transaction_id: &str) -> Result<Vec<LedgerEntry>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<_> = tables
            .entries
            .iter()
            .filter(|entry| entry.transaction_id == transaction_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.entry_index);
        Ok(entries)
    }

    async fn entries_by_account(&self, account_id: &str, limit: usize) -> Result<Vec<LedgerEntry>> {
        let tables = self.inner.read().await;
        Ok(tables
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.account_id == account_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Thread-safe in-memory payment intent table.
#[derive(Default, Clone)]
pub struct InMemoryIntentStore {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare-and-swap core shared by both update flavors. Mirrors the
    /// relational `UPDATE ... WHERE id = ? AND version = ?`: a missing row
    /// and a stale version both affect zero rows.
    async fn compare_and_swap(
        &self,
        id: &str,
        expected_version: i64,
        apply: impl FnOnce(&mut PaymentIntent),
    ) -> Result<()> {
        let mut intents = self.intents.write().await;
        let Some(intent) = intents.get_mut(id).filter(|i| i.version == expected_version) else {
            return Err(PaymentError::VersionMismatch);
        };
        apply(intent);
        intent.version += 1;
        intent.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn create(&self, intent: PaymentIntent) -> Result<()> {
        let mut intents = self.intents.write().await;
        if intents.contains_key(&intent.id) {
            return Err(PaymentError::AlreadyExists(intent.id));
        }
        intents.insert(intent.id.clone(), intent);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<PaymentIntent> {
        let intents = self.intents.read().await;
        intents
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::IntentNotFound(id.to_string()))
    }

    async fn get_by_idempotency_key(
        &self,
        merchant_id: &str,
        key: &str,
    ) -> Result<Option<PaymentIntent>> {
        let intents = self.intents.read().await;
        Ok(intents
            .values()
            .find(|intent| {
                intent.merchant_id == merchant_id
                    && intent.idempotency_key.as_deref() == Some(key)
            })
            .cloned())
    }

    async fn update_state(
        &self,
        id: &str,
        state: PaymentState,
        expected_version: i64,
    ) -> Result<()> {
        self.compare_and_swap(id, expected_version, |intent| {
            intent.state = state;
        })
        .await
    }

    async fn update_state_with_provider(
        &self,
        id: &str,
        state: PaymentState,
        provider: &str,
        provider_payment_id: &str,
        expected_version: i64,
    ) -> Result<()> {
        self.compare_and_swap(id, expected_version, |intent| {
            intent.state = state;
            intent.selected_provider = Some(provider.to_string());
            intent.provider_payment_id = Some(provider_payment_id.to_string());
        })
        .await
    }

    async fn list(&self, merchant_id: &str, limit: usize) -> Result<Vec<PaymentIntent>> {
        let intents = self.intents.read().await;
        let mut rows: Vec<_> = intents
            .values()
            .filter(|intent| intent.merchant_id == merchant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Thread-safe in-memory idempotency record table.
#[derive(Default, Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<(String, String), IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(merchant_id.to_string(), key.to_string()))
            .filter(|record| !record.is_expired(Utc::now()))
            .cloned())
    }

    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records
            .entry((record.merchant_id.clone(), record.idempotency_key.clone()))
            .or_insert(record);
        Ok(())
    }
}
