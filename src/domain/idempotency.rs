use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Stored outcome of a processed request, keyed by
/// `(merchant_id, idempotency_key)`. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub id: String,
    pub merchant_id: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub response_body: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// SHA-256 over the canonical JSON serialization of the request body,
/// lowercase hex. Two requests with the same hash are treated as the same
/// request for replay purposes.
pub fn hash_request<T: Serialize>(body: &T) -> Result<String> {
    let data = serde_json::to_vec(body)?;
    Ok(format!("{:x}", Sha256::digest(&data)))
}
