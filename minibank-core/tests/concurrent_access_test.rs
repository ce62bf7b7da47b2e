//! Concurrent ledger access tests
//!
//! Many tasks move money on the same account at once. The final balance must
//! equal the sum of every successful transaction, which only holds if the
//! store applies increments rather than read-modify-write.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use minibank_core::config::{Argon2Params, Config};
use minibank_core::domain::{DEPOSIT, WITHDRAWAL};
use minibank_core::{BankContext, Error, Money, OverdraftPolicy};

/// Number of concurrent tasks
const TASK_COUNT: usize = 8;

/// Number of transactions per task
const ITERATIONS_PER_TASK: usize = 25;

fn open_context(temp_dir: &TempDir, overdraft: OverdraftPolicy) -> Arc<BankContext> {
    let config = Config {
        token_secret: Some("concurrency-test-secret-0123456789abcdef".to_string()),
        overdraft,
        password_hashing: Argon2Params {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
        },
        ..Config::default()
    };
    Arc::new(BankContext::open(temp_dir.path(), config).unwrap())
}

/// Mixed deposits and withdrawals with overdraft allowed: every call succeeds
/// and no update is lost.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transactions_lose_no_updates() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = open_context(&temp_dir, OverdraftPolicy::Allow);

    let user = ctx
        .auth_service
        .register("racer", "racer@example.com", "pw")
        .await
        .unwrap()
        .user
        .id;
    let account = ctx
        .transaction_service
        .create_account(Some(user), "checking")
        .await
        .unwrap();
    let account_id = account.id;

    let mut handles = Vec::new();
    for task_id in 0..TASK_COUNT {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            for i in 0..ITERATIONS_PER_TASK {
                let (amount, kind) = if (task_id + i) % 3 == 0 {
                    (7, WITHDRAWAL)
                } else {
                    (10, DEPOSIT)
                };
                ctx.transaction_service
                    .perform_transaction(Some(user), account_id, Money::from_minor(amount), kind, None)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let history = ctx
        .transaction_service
        .account_transactions(Some(user), account.id)
        .await
        .unwrap();
    assert_eq!(history.len(), TASK_COUNT * ITERATIONS_PER_TASK);

    let expected: i64 = history.iter().map(|tx| tx.amount.minor_units()).sum();
    let accounts = ctx.transaction_service.list_accounts(Some(user)).await.unwrap();
    assert_eq!(accounts[0].balance, Money::from_minor(expected));

    let health = ctx.doctor_service.run_checks().await.unwrap();
    assert!(health.is_healthy(), "{:?}", health.summary);
}

/// Concurrent withdrawals against a small balance with overdraft rejected:
/// the balance never goes negative and exactly the affordable number succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = open_context(&temp_dir, OverdraftPolicy::Reject);

    let user = ctx
        .auth_service
        .register("saver", "saver@example.com", "pw")
        .await
        .unwrap()
        .user
        .id;
    let account = ctx
        .transaction_service
        .create_account(Some(user), "savings")
        .await
        .unwrap();
    ctx.transaction_service
        .perform_transaction(Some(user), account.id, Money::from_minor(100), DEPOSIT, None)
        .await
        .unwrap();
    let account_id = account.id;

    let succeeded = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let withdrawn = Arc::new(AtomicI64::new(0));

    let mut handles = Vec::new();
    for _ in 0..TASK_COUNT {
        let ctx = Arc::clone(&ctx);
        let succeeded = Arc::clone(&succeeded);
        let rejected = Arc::clone(&rejected);
        let withdrawn = Arc::clone(&withdrawn);
        handles.push(tokio::spawn(async move {
            for _ in 0..5 {
                match ctx
                    .transaction_service
                    .perform_transaction(Some(user), account_id, Money::from_minor(10), WITHDRAWAL, None)
                    .await
                {
                    Ok(tx) => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                        withdrawn.fetch_add(-tx.amount.minor_units(), Ordering::SeqCst);
                    }
                    Err(Error::Validation(_)) => {
                        rejected.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    println!(
        "succeeded: {}, rejected: {}",
        succeeded.load(Ordering::SeqCst),
        rejected.load(Ordering::SeqCst)
    );
    assert_eq!(succeeded.load(Ordering::SeqCst), 10);
    assert_eq!(rejected.load(Ordering::SeqCst), TASK_COUNT * 5 - 10);
    assert_eq!(withdrawn.load(Ordering::SeqCst), 100);

    let accounts = ctx.transaction_service.list_accounts(Some(user)).await.unwrap();
    assert_eq!(accounts[0].balance, Money::ZERO);
}
