use chrono::Utc;
use tracing::info;

use crate::domain::ledger::{Account, AccountType, LedgerEntry, PostTransactionRequest, Transaction};
use crate::domain::ports::LedgerStoreBox;
use crate::error::{PaymentError, Result};
use crate::id;

/// Validates and durably posts balanced multi-entry transactions, and serves
/// derived read projections over the entry history.
pub struct LedgerService {
    store: LedgerStoreBox,
}

impl LedgerService {
    pub fn new(store: LedgerStoreBox) -> Self {
        Self { store }
    }

    pub async fn create_account(
        &self,
        id: &str,
        name: &str,
        account_type: AccountType,
        currency: &str,
    ) -> Result<Account> {
        if id.is_empty() {
            return Err(PaymentError::Validation(
                "account id is required".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(PaymentError::Validation(
                "account name is required".to_string(),
            ));
        }
        if currency.is_empty() {
            return Err(PaymentError::Validation(
                "currency is required".to_string(),
            ));
        }
        let now = Utc::now();
        let account = Account {
            id: id.to_string(),
            name: name.to_string(),
            account_type,
            currency: currency.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_account(account.clone()).await?;
        info!(account = %account.id, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: &str) -> Result<Account> {
        self.store.get_account(id).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.store.list_accounts().await
    }

    /// Validates the request, then commits the header and all entries as one
    /// atomic unit. Request order is preserved as `entry_index`.
    pub async fn post_transaction(&self, req: PostTransactionRequest) -> Result<()> {
        req.validate()?;

        let now = Utc::now();
        let transaction = Transaction {
            id: req.transaction_id.clone(),
            description: req.description.clone(),
            created_at: now,
        };
        let entries = req
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| LedgerEntry {
                id: id::generate("ent"),
                transaction_id: req.transaction_id.clone(),
                entry_index: index,
                account_id: entry.account_id.clone(),
                amount: entry.amount,
                currency: entry.currency.clone(),
                created_at: now,
            })
            .collect();

        self.store.insert_transaction(transaction, entries).await?;
        info!(
            transaction = %req.transaction_id,
            legs = req.entries.len(),
            "transaction posted"
        );
        Ok(())
    }

    /// Header plus entries ordered by `entry_index`.
    pub async fn get_transaction(&self, id: &str) -> Result<(Transaction, Vec<LedgerEntry>)> {
        let transaction = self.store.get_transaction(id).await?;
        let entries = self.store.entries_by_transaction(id).await?;
        Ok((transaction, entries))
    }

    /// Balance is derived by replaying the account's entry history. No cached
    /// balance field exists anywhere in the system.
    pub async fn account_balance(&self, account_id: &str) -> Result<i64> {
        let entries = self.store.entries_by_account(account_id, usize::MAX).await?;
        Ok(entries.iter().map(|entry| entry.amount).sum())
    }

    /// Most recent entries first.
    pub async fn entries_by_account(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.store.entries_by_account(account_id, limit).await
    }
}
