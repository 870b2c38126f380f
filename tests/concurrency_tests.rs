use std::sync::Arc;

use payline::application::ledger::LedgerService;
use payline::application::payments::PaymentService;
use payline::domain::ledger::{EntryRequest, PostTransactionRequest};
use payline::domain::payment::{CreateIntentRequest, PaymentState};
use payline::error::PaymentError;
use payline::infrastructure::in_memory::{InMemoryIntentStore, InMemoryLedgerStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_concurrent_authorize_wins() {
    let service = Arc::new(PaymentService::new(Box::new(InMemoryIntentStore::new())));
    let intent = service
        .create_intent(CreateIntentRequest {
            merchant_id: "m1".to_string(),
            amount: 10_000,
            currency: "USD".to_string(),
            idempotency_key: None,
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let intent_id = intent.id.clone();
        handles.push(tokio::spawn(
            async move { service.authorize_intent(&intent_id).await },
        ));
    }

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(updated) => {
                winners += 1;
                assert_eq!(updated.state, PaymentState::Authorized);
                assert_eq!(updated.version, 1);
            }
            // A loser either lost the compare-and-swap race outright, or
            // read after the winner committed and saw an already-authorized
            // intent. Both are deterministic rejections, never overwrites.
            Err(PaymentError::VersionMismatch)
            | Err(PaymentError::InvalidTransition { .. }) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);

    let final_row = service.get_intent(&intent.id).await.unwrap();
    assert_eq!(final_row.state, PaymentState::Authorized);
    assert_eq!(final_row.version, 1);
    assert!(final_row.provider_payment_id.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_captures_commit_exactly_once() {
    let service = Arc::new(PaymentService::new(Box::new(InMemoryIntentStore::new())));
    let intent = service
        .create_intent(CreateIntentRequest {
            merchant_id: "m1".to_string(),
            amount: 10_000,
            currency: "USD".to_string(),
            idempotency_key: None,
        })
        .await
        .unwrap();
    service.authorize_intent(&intent.id).await.unwrap();

    // The graph allows a single capture, so of two racing captures exactly
    // one commits regardless of interleaving.
    let mut handles = Vec::new();
    for amount in [10_000, 7_500] {
        let service = Arc::clone(&service);
        let id = intent.id.clone();
        handles.push(tokio::spawn(
            async move { service.capture_intent(&id, amount).await },
        ));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(updated) => {
                winners += 1;
                assert_eq!(updated.state, PaymentState::Captured);
            }
            Err(PaymentError::VersionMismatch)
            | Err(PaymentError::InvalidTransition { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);

    let final_row = service.get_intent(&intent.id).await.unwrap();
    assert_eq!(final_row.state, PaymentState::Captured);
    assert_eq!(final_row.version, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicate_postings_commit_once() {
    let service = Arc::new(LedgerService::new(Box::new(InMemoryLedgerStore::new())));

    let mut handles = Vec::new();
    for i in 0..8i64 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            // Same transaction id, different amounts per contender.
            let amount = (i + 1) * 100;
            service
                .post_transaction(PostTransactionRequest {
                    transaction_id: "txn_contended".to_string(),
                    description: "contended posting".to_string(),
                    entries: vec![
                        EntryRequest {
                            account_id: "acc_a".to_string(),
                            amount: -amount,
                            currency: "USD".to_string(),
                        },
                        EntryRequest {
                            account_id: "acc_b".to_string(),
                            amount,
                            currency: "USD".to_string(),
                        },
                    ],
                })
                .await
        }));
    }

    let mut committed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => committed += 1,
            Err(PaymentError::AlreadyExists(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(rejected, 7);

    // The committed group is intact and balanced.
    let (_, entries) = service.get_transaction("txn_contended").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount).sum::<i64>(), 0);
    let a = service.account_balance("acc_a").await.unwrap();
    let b = service.account_balance("acc_b").await.unwrap();
    assert_eq!(a + b, 0);
    assert_ne!(a, 0);
}
