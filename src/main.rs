use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use payline::application::idempotency::{IdempotencyCheck, IdempotencyGuard};
use payline::application::ledger::LedgerService;
use payline::application::payments::PaymentService;
use payline::domain::idempotency::hash_request;
use payline::domain::ledger::{AccountType, EntryRequest, PostTransactionRequest};
use payline::domain::payment::CreateIntentRequest;
use payline::domain::ports::{IdempotencyStoreBox, IntentStoreBox, LedgerStoreBox};
use payline::error::PaymentError;
use payline::id;
use payline::infrastructure::in_memory::{
    InMemoryIdempotencyStore, InMemoryIntentStore, InMemoryLedgerStore,
};

/// Demo driver: runs a create -> authorize -> capture flow for one merchant
/// and posts the matching balanced ledger transaction.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Intent amount in minor currency units
    #[arg(long, default_value_t = 10_000)]
    amount: i64,

    /// Capture amount in minor currency units
    #[arg(long, default_value_t = 7_500)]
    capture: i64,

    /// Currency code
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = cli.db_path.as_deref() {
        use payline::infrastructure::rocksdb::RocksDbStore;

        let store = RocksDbStore::open(path).into_diagnostic()?;
        return run_demo(
            &cli,
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(store),
        )
        .await;
    }

    run_demo(
        &cli,
        Box::new(InMemoryLedgerStore::new()),
        Box::new(InMemoryIntentStore::new()),
        Box::new(InMemoryIdempotencyStore::new()),
    )
    .await
}

async fn run_demo(
    cli: &Cli,
    ledger_store: LedgerStoreBox,
    intent_store: IntentStoreBox,
    idempotency_store: IdempotencyStoreBox,
) -> Result<()> {
    let ledger = LedgerService::new(ledger_store);
    let payments = PaymentService::new(intent_store);
    let guard = IdempotencyGuard::new(idempotency_store, chrono::Duration::hours(24));

    for (account_id, name, account_type) in [
        ("acc_cash", "Platform cash", AccountType::Asset),
        ("acc_receivable", "Merchant receivable", AccountType::Liability),
        ("acc_fee", "Platform fees", AccountType::Revenue),
    ] {
        match ledger
            .create_account(account_id, name, account_type, &cli.currency)
            .await
        {
            Ok(_) | Err(PaymentError::AlreadyExists(_)) => {}
            Err(err) => return Err(err).into_diagnostic(),
        }
    }

    let request = CreateIntentRequest {
        merchant_id: "m1".to_string(),
        amount: cli.amount,
        currency: cli.currency.clone(),
        idempotency_key: Some("demo-checkout".to_string()),
    };
    let request_hash = hash_request(&request).into_diagnostic()?;

    if let IdempotencyCheck::Replay(record) = guard
        .check("m1", "demo-checkout", &request_hash)
        .await
        .into_diagnostic()?
    {
        println!("replaying stored response: {}", record.response_body);
        return Ok(());
    }

    let intent = payments.create_intent(request).await.into_diagnostic()?;
    payments.authorize_intent(&intent.id).await.into_diagnostic()?;
    let intent = payments
        .capture_intent(&intent.id, cli.capture)
        .await
        .into_diagnostic()?;

    let fee = cli.capture * 3 / 100;
    let mut entries = vec![
        EntryRequest {
            account_id: "acc_cash".to_string(),
            amount: -cli.capture,
            currency: cli.currency.clone(),
        },
        EntryRequest {
            account_id: "acc_receivable".to_string(),
            amount: cli.capture - fee,
            currency: cli.currency.clone(),
        },
    ];
    if fee > 0 {
        entries.push(EntryRequest {
            account_id: "acc_fee".to_string(),
            amount: fee,
            currency: cli.currency.clone(),
        });
    }
    ledger
        .post_transaction(PostTransactionRequest {
            transaction_id: id::generate("txn"),
            description: format!("capture for {}", intent.id),
            entries,
        })
        .await
        .into_diagnostic()?;

    let response_body = serde_json::to_string(&intent).into_diagnostic()?;
    guard
        .save_response("m1", "demo-checkout", &request_hash, &response_body, 200)
        .await
        .into_diagnostic()?;

    println!(
        "intent {} state={} version={}",
        intent.id, intent.state, intent.version
    );
    for account_id in ["acc_cash", "acc_receivable", "acc_fee"] {
        let balance = ledger.account_balance(account_id).await.into_diagnostic()?;
        println!("{account_id}: {balance}");
    }
    Ok(())
}
