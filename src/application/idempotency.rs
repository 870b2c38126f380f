use chrono::{Duration, Utc};
use tracing::info;

use crate::domain::idempotency::IdempotencyRecord;
use crate::domain::ports::IdempotencyStoreBox;
use crate::error::{PaymentError, Result};
use crate::id;

/// Outcome of an idempotency lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyCheck {
    /// No live record: proceed as a new request.
    Miss,
    /// The same request was already processed. The caller should
    /// short-circuit and replay the stored response verbatim.
    Replay(IdempotencyRecord),
}

/// Deduplicates externally retried requests keyed by
/// `(merchant_id, idempotency_key)`.
pub struct IdempotencyGuard {
    store: IdempotencyStoreBox,
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(store: IdempotencyStoreBox, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// An empty key disables deduplication and always misses. A live record
    /// with a matching request hash replays; a differing hash means the key
    /// was reused for a materially different request and is rejected.
    pub async fn check(
        &self,
        merchant_id: &str,
        key: &str,
        request_hash: &str,
    ) -> Result<IdempotencyCheck> {
        if key.is_empty() {
            return Ok(IdempotencyCheck::Miss);
        }
        match self.store.get(merchant_id, key).await? {
            None => Ok(IdempotencyCheck::Miss),
            Some(record) if record.request_hash == request_hash => {
                info!(merchant = merchant_id, key, "request already processed");
                Ok(IdempotencyCheck::Replay(record))
            }
            Some(_) => Err(PaymentError::ConflictingKeyReuse),
        }
    }

    /// Records the response for later replay, valid for the guard's TTL.
    /// Insert-if-absent semantics: when two first-time requests race, the
    /// later save is a harmless no-op rather than an overwrite.
    pub async fn save_response(
        &self,
        merchant_id: &str,
        key: &str,
        request_hash: &str,
        response_body: &str,
        status_code: u16,
    ) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let record = IdempotencyRecord {
            id: id::generate("idem"),
            merchant_id: merchant_id.to_string(),
            idempotency_key: key.to_string(),
            request_hash: request_hash.to_string(),
            response_body: response_body.to_string(),
            status_code,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.put_if_absent(record).await
    }
}
