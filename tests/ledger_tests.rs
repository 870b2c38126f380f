use std::sync::Arc;

use payline::application::ledger::LedgerService;
use payline::domain::ledger::{EntryRequest, PostTransactionRequest};
use payline::error::PaymentError;
use payline::infrastructure::in_memory::InMemoryLedgerStore;

fn entry(account_id: &str, amount: i64) -> EntryRequest {
    EntryRequest {
        account_id: account_id.to_string(),
        amount,
        currency: "USD".to_string(),
    }
}

fn posting(transaction_id: &str, entries: Vec<EntryRequest>) -> PostTransactionRequest {
    PostTransactionRequest {
        transaction_id: transaction_id.to_string(),
        description: "integration test posting".to_string(),
        entries,
    }
}

#[tokio::test]
async fn test_settlement_posting_scenario() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));

    service
        .post_transaction(posting(
            "txn_settle",
            vec![
                entry("acc_cash", -10_000),
                entry("acc_receivable", 9_700),
                entry("acc_fee", 300),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(service.account_balance("acc_cash").await.unwrap(), -10_000);
    assert_eq!(
        service.account_balance("acc_receivable").await.unwrap(),
        9_700
    );
    assert_eq!(service.account_balance("acc_fee").await.unwrap(), 300);
}

#[tokio::test]
async fn test_unbalanced_posting_leaves_no_trace() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));

    let result = service
        .post_transaction(posting(
            "txn_bad",
            vec![entry("acc_cash", -10_000), entry("acc_receivable", 5_000)],
        ))
        .await;
    assert!(matches!(result, Err(PaymentError::UnbalancedTransaction)));

    assert!(matches!(
        service.get_transaction("txn_bad").await,
        Err(PaymentError::TransactionNotFound(_))
    ));
    assert_eq!(service.account_balance("acc_cash").await.unwrap(), 0);
    assert_eq!(service.account_balance("acc_receivable").await.unwrap(), 0);
}

#[tokio::test]
async fn test_double_entry_needs_two_legs() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));

    let result = service
        .post_transaction(posting("txn_one_leg", vec![entry("acc_cash", 100)]))
        .await;
    assert!(matches!(result, Err(PaymentError::Validation(_))));

    let result = service.post_transaction(posting("txn_no_legs", vec![])).await;
    assert!(matches!(result, Err(PaymentError::Validation(_))));
}

#[tokio::test]
async fn test_per_entry_validation() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));

    let result = service
        .post_transaction(posting(
            "txn_zero",
            vec![entry("acc_cash", 0), entry("acc_fee", -100), entry("acc_x", 100)],
        ))
        .await;
    assert!(matches!(result, Err(PaymentError::InvalidAmount)));

    let mut no_currency = entry("acc_fee", 100);
    no_currency.currency = String::new();
    let result = service
        .post_transaction(posting("txn_nocur", vec![entry("acc_cash", -100), no_currency]))
        .await;
    assert!(matches!(result, Err(PaymentError::InvalidCurrency)));
}

#[tokio::test]
async fn test_closed_account_set_nets_to_zero() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));
    let accounts = ["acc_a", "acc_b", "acc_c"];

    service
        .post_transaction(posting(
            "txn_1",
            vec![entry("acc_a", -5_000), entry("acc_b", 3_000), entry("acc_c", 2_000)],
        ))
        .await
        .unwrap();
    service
        .post_transaction(posting(
            "txn_2",
            vec![entry("acc_b", -1_200), entry("acc_c", 1_200)],
        ))
        .await
        .unwrap();
    service
        .post_transaction(posting(
            "txn_3",
            vec![entry("acc_c", -700), entry("acc_a", 700)],
        ))
        .await
        .unwrap();

    let mut total = 0;
    for account in accounts {
        total += service.account_balance(account).await.unwrap();
    }
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_transaction_read_back_preserves_leg_order() {
    let service = LedgerService::new(Box::new(InMemoryLedgerStore::new()));
    service
        .post_transaction(posting(
            "txn_ordered",
            vec![
                entry("acc_fee", 300),
                entry("acc_cash", -10_000),
                entry("acc_receivable", 9_700),
            ],
        ))
        .await
        .unwrap();

    let (header, entries) = service.get_transaction("txn_ordered").await.unwrap();
    assert_eq!(header.description, "integration test posting");
    let accounts: Vec<_> = entries.iter().map(|e| e.account_id.as_str()).collect();
    assert_eq!(accounts, ["acc_fee", "acc_cash", "acc_receivable"]);
    let indexes: Vec<_> = entries.iter().map(|e| e.entry_index).collect();
    assert_eq!(indexes, [0, 1, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_concurrent_postings_keep_balances_consistent() {
    let service = Arc::new(LedgerService::new(Box::new(InMemoryLedgerStore::new())));

    // 16 tasks moving money between the same two accounts in both
    // directions. Every posting is individually balanced, so whatever the
    // interleaving, the closed set must net to zero.
    let mut handles = Vec::new();
    for i in 0..16i64 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let (from, to) = if i % 2 == 0 {
                ("acc_a", "acc_b")
            } else {
                ("acc_b", "acc_a")
            };
            let amount = (i + 1) * 100;
            service
                .post_transaction(posting(
                    &format!("txn_{i}"),
                    vec![entry(from, -amount), entry(to, amount)],
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let a = service.account_balance("acc_a").await.unwrap();
    let b = service.account_balance("acc_b").await.unwrap();
    assert_eq!(a + b, 0);

    // Every posting is visible in full: 16 transactions, 2 legs each.
    let mut legs = 0;
    for i in 0..16 {
        let (_, entries) = service.get_transaction(&format!("txn_{i}")).await.unwrap();
        assert_eq!(entries.len(), 2);
        legs += entries.len();
    }
    assert_eq!(legs, 32);
}
