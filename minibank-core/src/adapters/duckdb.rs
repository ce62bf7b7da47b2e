//! DuckDB store implementation
//!
//! One connection serves both the credential and the ledger store. Every
//! call runs on tokio's blocking pool; the mutex only hands out the
//! connection, atomicity comes from DuckDB transactions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, OptionalExt, Row};

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountId, Money, NewTransaction, NewUser, OverdraftPolicy, Transaction, User,
    UserCredentials, UserId,
};
use crate::ports::{CredentialStore, LedgerStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// DuckDB renders TIMESTAMP as text in this shape; the fraction is optional
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Microsecond precision matches DuckDB's TIMESTAMP
const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn is_unique_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// A write step inside `apply_transaction` where a one-shot failure can be
/// injected. Used by tests to prove the ledger write is all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// After the transaction row is inserted, before the balance increment
    BeforeBalanceUpdate,
    /// After both writes, before commit
    BeforeCommit,
}

/// Aggregate counts used by status and doctor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub users: i64,
    pub accounts: i64,
    pub transactions: i64,
    /// Sum of all balances in minor units; wider than `Money` so that many
    /// large accounts cannot overflow it
    pub total_balance: i128,
}

/// An account whose stored balance differs from its transaction sum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub balance: Money,
    pub transaction_sum: Money,
}

/// DuckDB-backed credential and ledger store
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    fault: Arc<Mutex<Option<FaultPoint>>>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Connection::open(db_path) {
                Ok(conn) => return Ok(Self::from_connection(conn, Some(db_path.to_path_buf()))),
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            fault: Arc::new(Mutex::new(None)),
            db_path,
        }
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let mut conn = lock(&self.conn)?;
        MigrationService::new(&mut conn)
            .run_pending()
            .map_err(|e| Error::store(format!("{:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Arm a one-shot failure for the next `apply_transaction`
    #[doc(hidden)]
    pub fn inject_fault(&self, point: FaultPoint) -> Result<()> {
        *lock(&self.fault)? = Some(point);
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await?
    }

    // === Reporting ===

    pub async fn totals(&self) -> Result<LedgerTotals> {
        self.with_conn(|conn| {
            let (users, accounts, transactions, total_balance) = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM users),
                        (SELECT COUNT(*) FROM accounts),
                        (SELECT COUNT(*) FROM transactions),
                        (SELECT CAST(COALESCE(SUM(balance), 0) AS HUGEINT) FROM accounts)",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i128>(3)?,
                    ))
                },
            )?;
            Ok(LedgerTotals {
                users,
                accounts,
                transactions,
                total_balance,
            })
        })
        .await
    }

    /// Accounts whose balance does not equal the sum of their transactions
    pub async fn balance_mismatches(&self) -> Result<Vec<BalanceMismatch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.account_id, a.balance,
                        CAST(COALESCE(SUM(t.amount), 0) AS BIGINT) AS tx_sum
                 FROM accounts a
                 LEFT JOIN transactions t ON t.account_id = a.account_id
                 GROUP BY a.account_id, a.balance
                 HAVING a.balance <> CAST(COALESCE(SUM(t.amount), 0) AS BIGINT)
                 ORDER BY a.account_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(BalanceMismatch {
                        account_id: row.get(0)?,
                        balance: Money::from_minor(row.get(1)?),
                        transaction_sum: Money::from_minor(row.get(2)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    /// Transaction ids whose account no longer exists
    pub async fn orphaned_transactions(&self) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.transaction_id FROM transactions t
                 LEFT JOIN accounts a ON t.account_id = a.account_id
                 WHERE a.account_id IS NULL
                 ORDER BY t.transaction_id",
            )?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
        .await
    }

    pub async fn zero_amount_transactions(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE amount = 0",
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}

#[async_trait]
impl CredentialStore for DuckDbStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let inserted = conn.query_row(
                "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)
                 RETURNING user_id",
                params![user.username, user.email, user.password_hash],
                |row| row.get::<_, i64>(0),
            );
            match inserted {
                Ok(id) => Ok(User::new(id, user.username, user.email)),
                Err(e) if is_unique_violation(&e) => Err(Error::conflict(format!(
                    "username '{}' is already taken",
                    user.username
                ))),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, email, password_hash FROM users WHERE username = ?",
            )?;
            let mut rows = stmt.query(params![username])?;
            match rows.next()? {
                Some(row) => Ok(Some(UserCredentials {
                    user: User::new(row.get(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                    password_hash: row.get(3)?,
                })),
                None => Ok(None),
            }
        })
        .await
    }
}

#[async_trait]
impl LedgerStore for DuckDbStore {
    async fn create_account(&self, owner_id: UserId, account_type: &str) -> Result<Account> {
        let account_type = account_type.to_string();
        self.with_conn(move |conn| {
            let id = conn.query_row(
                "INSERT INTO accounts (user_id, account_type, balance) VALUES (?, ?, 0)
                 RETURNING account_id",
                params![owner_id, account_type],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(Account {
                id,
                owner_id,
                account_type,
                balance: Money::ZERO,
            })
        })
        .await
    }

    async fn accounts_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, user_id, account_type, balance FROM accounts
                 WHERE user_id = ? ORDER BY account_id",
            )?;
            let accounts = stmt
                .query_map(params![owner_id], row_to_account)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(accounts)
        })
        .await
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, user_id, account_type, balance FROM accounts
                 WHERE account_id = ?",
            )?;
            let mut rows = stmt.query(params![account_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_account(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn apply_transaction(
        &self,
        entry: &NewTransaction,
        policy: OverdraftPolicy,
    ) -> Result<Transaction> {
        let entry = entry.clone();
        let fault = lock(&self.fault)?.take();
        self.with_conn(move |conn| apply_transaction_in(conn, &entry, policy, fault))
            .await
    }

    async fn transactions_by_account(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT transaction_id, account_id, amount, transaction_type, description,
                        CAST(created_at AS VARCHAR)
                 FROM transactions WHERE account_id = ?
                 ORDER BY transaction_id",
            )?;
            let txs = stmt
                .query_map(params![account_id], row_to_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(txs)
        })
        .await
    }
}

/// The atomic ledger write: overflow check, insert, guarded increment, commit.
///
/// Any early return drops the DuckDB transaction, which rolls it back. The
/// connection mutex is held for the whole call, so the balance read for the
/// overflow check cannot go stale before the increment.
fn apply_transaction_in(
    conn: &mut Connection,
    entry: &NewTransaction,
    policy: OverdraftPolicy,
    fault: Option<FaultPoint>,
) -> Result<Transaction> {
    let created_at = Utc::now();
    let delta = entry.amount.minor_units();
    let tx = conn.transaction()?;

    let balance = tx
        .query_row(
            "SELECT balance FROM accounts WHERE account_id = ?",
            params![entry.account_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(Money::from_minor)
        .ok_or_else(|| Error::not_found(format!("account {} not found", entry.account_id)))?;
    if balance.checked_add(entry.amount).is_none() {
        return Err(Error::validation("amount would overflow the account balance"));
    }

    let id = tx.query_row(
        "INSERT INTO transactions (account_id, amount, transaction_type, description, created_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING transaction_id",
        params![
            entry.account_id,
            delta,
            entry.transaction_type,
            entry.description,
            created_at.naive_utc().format(TIMESTAMP_WRITE_FORMAT).to_string(),
        ],
        |row| row.get::<_, i64>(0),
    )?;

    if fault == Some(FaultPoint::BeforeBalanceUpdate) {
        return Err(Error::store("injected fault before balance update"));
    }

    // Credits always pass the guard; debits pass when overdraft is allowed
    // or the resulting balance stays non-negative.
    let unguarded = delta >= 0 || policy.allows_negative();
    let updated = tx.execute(
        "UPDATE accounts SET balance = balance + ?
         WHERE account_id = ? AND (? OR balance + ? >= 0)",
        params![delta, entry.account_id, unguarded, delta],
    )?;

    if updated == 0 {
        return Err(Error::validation("insufficient funds"));
    }

    if fault == Some(FaultPoint::BeforeCommit) {
        return Err(Error::store("injected fault before commit"));
    }

    tx.commit()?;

    Ok(Transaction {
        id,
        account_id: entry.account_id,
        amount: entry.amount,
        transaction_type: entry.transaction_type.clone(),
        description: entry.description.clone(),
        created_at,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| Error::store(format!("lock poisoned: {}", e)))
}

fn row_to_account(row: &Row<'_>) -> duckdb::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        account_type: row.get(2)?,
        balance: Money::from_minor(row.get(3)?),
    })
}

fn row_to_transaction(row: &Row<'_>) -> duckdb::Result<Transaction> {
    let created_str: String = row.get(5)?;
    let created_at = parse_timestamp(&created_str)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: Money::from_minor(row.get(2)?),
        transaction_type: row.get(3)?,
        description: row.get(4)?,
        created_at,
    })
}

/// Parse DuckDB's `TIMESTAMP` text form ("2024-01-15 10:30:00.123456")
fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "$argon2id$placeholder".to_string(),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        let with_fraction = parse_timestamp("2024-01-15 10:30:00.123456").unwrap();
        assert_eq!(with_fraction.timestamp(), 1705314600);
        let without_fraction = parse_timestamp("2024-01-15 10:30:00").unwrap();
        assert_eq!(without_fraction.timestamp(), 1705314600);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let store = store();
        store.create_user(&new_user("alice")).await.unwrap();
        let err = store.create_user(&new_user("alice")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_find_user_returns_hash() {
        let store = store();
        let created = store.create_user(&new_user("bob")).await.unwrap();
        let found = store.find_user_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.user, created);
        assert_eq!(found.password_hash, "$argon2id$placeholder");
        assert!(store.find_user_by_username("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_transaction_updates_balance() {
        let store = store();
        let account = store.create_account(1, "checking").await.unwrap();
        let entry = NewTransaction {
            account_id: account.id,
            amount: Money::from_minor(500),
            transaction_type: "deposit".to_string(),
            description: Some("paycheck".to_string()),
        };
        let tx = store.apply_transaction(&entry, OverdraftPolicy::Reject).await.unwrap();
        assert_eq!(tx.amount, Money::from_minor(500));

        let account = store.find_account(account.id).await.unwrap().unwrap();
        assert_eq!(account.balance, Money::from_minor(500));

        let history = store.transactions_by_account(account.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, tx.id);
        assert_eq!(history[0].description.as_deref(), Some("paycheck"));
    }

    #[tokio::test]
    async fn test_overdraft_guard() {
        let store = store();
        let account = store.create_account(1, "checking").await.unwrap();
        let debit = NewTransaction {
            account_id: account.id,
            amount: Money::from_minor(-1),
            transaction_type: "withdrawal".to_string(),
            description: None,
        };

        let err = store.apply_transaction(&debit, OverdraftPolicy::Reject).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.transactions_by_account(account.id).await.unwrap().is_empty());

        store.apply_transaction(&debit, OverdraftPolicy::Allow).await.unwrap();
        let account = store.find_account(account.id).await.unwrap().unwrap();
        assert_eq!(account.balance, Money::from_minor(-1));
    }

    #[tokio::test]
    async fn test_missing_account_writes_nothing() {
        let store = store();
        let entry = NewTransaction {
            account_id: 999,
            amount: Money::from_minor(10),
            transaction_type: "deposit".to_string(),
            description: None,
        };
        let err = store.apply_transaction(&entry, OverdraftPolicy::Allow).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.orphaned_transactions().await.unwrap().is_empty());
        assert_eq!(store.totals().await.unwrap().transactions, 0);
    }

    #[tokio::test]
    async fn test_balance_overflow_is_validation_error() {
        let store = store();
        let first = store.create_account(1, "checking").await.unwrap();
        let second = store.create_account(1, "savings").await.unwrap();
        let deposit = |account_id, units| NewTransaction {
            account_id,
            amount: Money::from_minor(units),
            transaction_type: "deposit".to_string(),
            description: None,
        };

        store
            .apply_transaction(&deposit(first.id, i64::MAX), OverdraftPolicy::Reject)
            .await
            .unwrap();
        let err = store
            .apply_transaction(&deposit(first.id, 1), OverdraftPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);

        let account = store.find_account(first.id).await.unwrap().unwrap();
        assert_eq!(account.balance, Money::from_minor(i64::MAX));
        assert_eq!(store.transactions_by_account(first.id).await.unwrap().len(), 1);

        // Debits past i64::MIN are refused the same way
        let debit = NewTransaction {
            account_id: second.id,
            amount: Money::from_minor(-i64::MAX),
            transaction_type: "withdrawal".to_string(),
            description: None,
        };
        store.apply_transaction(&debit, OverdraftPolicy::Allow).await.unwrap();
        let err = store
            .apply_transaction(&NewTransaction { amount: Money::from_minor(-2), ..debit }, OverdraftPolicy::Allow)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
        assert!(store.balance_mismatches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_totals_do_not_overflow() {
        let store = store();
        for account_type in ["checking", "savings"] {
            let account = store.create_account(1, account_type).await.unwrap();
            let entry = NewTransaction {
                account_id: account.id,
                amount: Money::from_minor(i64::MAX),
                transaction_type: "deposit".to_string(),
                description: None,
            };
            store.apply_transaction(&entry, OverdraftPolicy::Reject).await.unwrap();
        }

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.accounts, 2);
        assert_eq!(totals.total_balance, 2 * i64::MAX as i128);
    }
}
