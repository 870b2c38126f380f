use chrono::Utc;
use tracing::info;

use crate::domain::payment::{
    CreateIntentRequest, PaymentIntent, PaymentState, validate_transition,
};
use crate::domain::ports::IntentStoreBox;
use crate::error::{PaymentError, Result};
use crate::id;

/// Provider assigned during authorization. The real integration is an
/// external collaborator; authorization here is a no-op that always succeeds.
const MOCK_PROVIDER: &str = "mock_provider";

/// Enforces the payment lifecycle over optimistic-concurrency-controlled
/// state updates.
///
/// Every mutation shares one pattern: read the current row, validate the
/// transition (and amount ceiling where applicable), attempt a
/// compare-and-swap write with the version observed at read time, then
/// re-read and return the fresh row. A lost race surfaces as
/// `VersionMismatch` and is never retried internally; the caller must re-read
/// and redecide.
pub struct PaymentService {
    store: IntentStoreBox,
}

impl PaymentService {
    pub fn new(store: IntentStoreBox) -> Self {
        Self { store }
    }

    /// Creates a fresh intent at `Created`/version 0, or returns the existing
    /// row unchanged when the merchant already used this idempotency key.
    /// Key scope is per-merchant: the same key under another merchant creates
    /// an independent intent.
    pub async fn create_intent(&self, req: CreateIntentRequest) -> Result<PaymentIntent> {
        req.validate()?;

        let key = req
            .idempotency_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if let Some(key) = key.as_deref()
            && let Some(existing) = self
                .store
                .get_by_idempotency_key(&req.merchant_id, key)
                .await?
        {
            info!(
                intent = %existing.id,
                merchant = %req.merchant_id,
                "idempotency key already used, returning existing intent"
            );
            return Ok(existing);
        }

        let now = Utc::now();
        let intent = PaymentIntent {
            id: id::generate("pi"),
            merchant_id: req.merchant_id,
            amount: req.amount,
            currency: req.currency,
            state: PaymentState::Created,
            version: 0,
            idempotency_key: key,
            selected_provider: None,
            provider_payment_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create(intent.clone()).await?;
        info!(
            intent = %intent.id,
            merchant = %intent.merchant_id,
            amount = intent.amount,
            "intent created"
        );
        Ok(intent)
    }

    pub async fn get_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.store.get(id).await
    }

    /// Assigns the mock provider and a provider payment id, then transitions
    /// `Created -> Authorized` via compare-and-swap.
    pub async fn authorize_intent(&self, id: &str) -> Result<PaymentIntent> {
        let intent = self.store.get(id).await?;
        validate_transition(intent.state, PaymentState::Authorized)?;

        let provider_payment_id = id::generate("psp");
        self.store
            .update_state_with_provider(
                &intent.id,
                PaymentState::Authorized,
                MOCK_PROVIDER,
                &provider_payment_id,
                intent.version,
            )
            .await?;
        info!(intent = %intent.id, provider = MOCK_PROVIDER, "intent authorized");
        self.store.get(&intent.id).await
    }

    /// Transitions `Authorized -> Captured`. Partial capture is allowed; the
    /// amount may not exceed the intent's original amount. The transition
    /// graph permits a single capture, so amounts are not accumulated.
    pub async fn capture_intent(&self, id: &str, amount: i64) -> Result<PaymentIntent> {
        let intent = self.store.get(id).await?;
        validate_transition(intent.state, PaymentState::Captured)?;
        if amount > intent.amount {
            return Err(PaymentError::AmountExceeded {
                requested: amount,
                limit: intent.amount,
            });
        }

        self.store
            .update_state(&intent.id, PaymentState::Captured, intent.version)
            .await?;
        info!(intent = %intent.id, amount, "intent captured");
        self.store.get(&intent.id).await
    }

    /// Transitions `Captured -> Refunded`; the amount may not exceed the
    /// intent's original amount.
    pub async fn refund_intent(&self, id: &str, amount: i64, reason: &str) -> Result<PaymentIntent> {
        let intent = self.store.get(id).await?;
        validate_transition(intent.state, PaymentState::Refunded)?;
        if amount > intent.amount {
            return Err(PaymentError::AmountExceeded {
                requested: amount,
                limit: intent.amount,
            });
        }

        self.store
            .update_state(&intent.id, PaymentState::Refunded, intent.version)
            .await?;
        info!(intent = %intent.id, amount, reason, "intent refunded");
        self.store.get(&intent.id).await
    }

    /// Most recently created first.
    pub async fn list_intents(&self, merchant_id: &str, limit: usize) -> Result<Vec<PaymentIntent>> {
        self.store.list(merchant_id, limit).await
    }
}
