use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::domain::idempotency::IdempotencyRecord;
use crate::domain::ledger::{Account, LedgerEntry, Transaction};
use crate::domain::payment::{PaymentIntent, PaymentState};
use crate::domain::ports::{IdempotencyStore, IntentStore, LedgerStore};
use crate::error::{PaymentError, Result};

pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_ENTRIES: &str = "entries";
pub const CF_INTENTS: &str = "intents";
pub const CF_IDEMPOTENCY: &str = "idempotency";

/// Persistent backend over RocksDB implementing all three storage ports.
///
/// Values are JSON-encoded per column family. A ledger posting goes through a
/// `WriteBatch` so the header and every entry commit as one unit, and
/// read-modify-write sequences (compare-and-swap, insert-if-absent) are
/// serialized through a single writer gate. Entries are keyed by a monotonic
/// sequence so iteration order doubles as journal order.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
    entry_seq: Arc<AtomicU64>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the given path, ensuring the
    /// required column families exist and resuming the entry sequence from
    /// the last persisted journal position.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [
            CF_ACCOUNTS,
            CF_TRANSACTIONS,
            CF_ENTRIES,
            CF_INTENTS,
            CF_IDEMPOTENCY,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let mut next_seq = 0u64;
        if let Some(cf) = db.cf_handle(CF_ENTRIES)
            && let Some(item) = db.iterator_cf(cf, IteratorMode::End).next()
        {
            let (key, _value) = item?;
            if let Ok(bytes) = <[u8; 8]>::try_from(key.as_ref()) {
                next_seq = u64::from_be_bytes(bytes) + 1;
            }
        }

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
            entry_seq: Arc::new(AtomicU64::new(next_seq)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    async fn compare_and_swap(
        &self,
        id: &str,
        expected_version: i64,
        apply: impl FnOnce(&mut PaymentIntent) + Send,
    ) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let Some(mut intent) = self
            .get_json::<PaymentIntent>(CF_INTENTS, id.as_bytes())?
            .filter(|intent| intent.version == expected_version)
        else {
            return Err(PaymentError::VersionMismatch);
        };
        apply(&mut intent);
        intent.version += 1;
        intent.updated_at = Utc::now();
        self.put_json(CF_INTENTS, id.as_bytes(), &intent)
    }
}

fn idempotency_key(merchant_id: &str, key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(merchant_id.len() + key.len() + 1);
    bytes.extend_from_slice(merchant_id.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn create_account(&self, account: Account) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        if self
            .get_json::<Account>(CF_ACCOUNTS, account.id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::AlreadyExists(account.id));
        }
        self.put_json(CF_ACCOUNTS, account.id.as_bytes(), &account)
    }

    async fn get_account(&self, id: &str) -> Result<Account> {
        self.get_json(CF_ACCOUNTS, id.as_bytes())?
            .ok_or_else(|| PaymentError::AccountNotFound(id.to_string()))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.scan(CF_ACCOUNTS)?;
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn insert_transaction(
        &self,
        transaction: Transaction,
        entries: Vec<LedgerEntry>,
    ) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        if self
            .get_json::<Transaction>(CF_TRANSACTIONS, transaction.id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::AlreadyExists(transaction.id));
        }

        let transaction_cf = self.cf(CF_TRANSACTIONS)?;
        let entry_cf = self.cf(CF_ENTRIES)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            transaction_cf,
            transaction.id.as_bytes(),
            serde_json::to_vec(&transaction)?,
        );
        for entry in &entries {
            let seq = self.entry_seq.fetch_add(1, Ordering::SeqCst);
            batch.put_cf(entry_cf, seq.to_be_bytes(), serde_json::to_vec(entry)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_transaction(&self, id: &str) -> Result<Transaction> {
        self.get_json(CF_TRANSACTIONS, id.as_bytes())?
            .ok_or_else(|| PaymentError::TransactionNotFound(id.to_string()))
    }

    async fn entries_by_transaction(&self, transaction_id: &str) -> Result<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self.scan(CF_ENTRIES)?;
        entries.retain(|entry| entry.transaction_id == transaction_id);
        entries.sort_by_key(|entry| entry.entry_index);
        Ok(entries)
    }

    async fn entries_by_account(&self, account_id: &str, limit: usize) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_ENTRIES)?;
        let mut entries = Vec::new();
        // Reverse journal order gives most recent first.
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            if entries.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            let entry: LedgerEntry = serde_json::from_slice(&value)?;
            if entry.account_id == account_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl IntentStore for RocksDbStore {
    async fn create(&self, intent: PaymentIntent) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        if self
            .get_json::<PaymentIntent>(CF_INTENTS, intent.id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::AlreadyExists(intent.id));
        }
        self.put_json(CF_INTENTS, intent.id.as_bytes(), &intent)
    }

    async fn get(&self, id: &str) -> Result<PaymentIntent> {
        self.get_json(CF_INTENTS, id.as_bytes())?
            .ok_or_else(|| PaymentError::IntentNotFound(id.to_string()))
    }

    async fn get_by_idempotency_key(
        &self,
        merchant_id: &str,
        key: &str,
    ) -> Result<Option<PaymentIntent>> {
        let intents: Vec<PaymentIntent> = self.scan(CF_INTENTS)?;
        Ok(intents.into_iter().find(|intent| {
            intent.merchant_id == merchant_id && intent.idempotency_key.as_deref() == Some(key)
        }))
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
        let mut intents: Vec<PaymentIntent> = self.scan(CF_INTENTS)?;
        intents.retain(|intent| intent.merchant_id == merchant_id);
        intents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        intents.truncate(limit);
        Ok(intents)
    }
}

#[async_trait]
impl IdempotencyStore for RocksDbStore {
    async fn get(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let record: Option<IdempotencyRecord> =
            self.get_json(CF_IDEMPOTENCY, &idempotency_key(merchant_id, key))?;
        Ok(record.filter(|record| !record.is_expired(Utc::now())))
    }

    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let db_key = idempotency_key(&record.merchant_id, &record.idempotency_key);
        if self
            .get_json::<IdempotencyRecord>(CF_IDEMPOTENCY, &db_key)?
            .is_some()
        {
            return Ok(());
        }
        self.put_json(CF_IDEMPOTENCY, &db_key, &record)
    }
}
