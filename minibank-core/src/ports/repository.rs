//! Store ports - persistence abstraction

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{
    Account, AccountId, NewTransaction, NewUser, OverdraftPolicy, Transaction, User,
    UserCredentials, UserId,
};

/// Persistence for user identities and password hashes
///
/// The store owns user records exclusively and enforces username uniqueness.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Fails with `Error::Conflict` if the username is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// Look up a user and its password hash by exact username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>>;
}

/// Persistence for accounts and their transactions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // === Accounts ===

    /// Create an account with a zero balance
    async fn create_account(&self, owner_id: UserId, account_type: &str) -> Result<Account>;

    /// All accounts owned by a user, in store order
    async fn accounts_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>>;

    /// Get account by ID
    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>>;

    // === Transactions ===

    /// Insert the transaction row and add its amount to the account balance
    /// as one atomic unit.
    ///
    /// The balance change must be a store-level increment so that concurrent
    /// calls on the same account serialize in the store. Under
    /// `OverdraftPolicy::Reject` a debit that would leave the balance
    /// negative fails with `Error::Validation` and nothing is written. A
    /// missing account fails with `Error::NotFound` and nothing is written.
    async fn apply_transaction(
        &self,
        entry: &NewTransaction,
        policy: OverdraftPolicy,
    ) -> Result<Transaction>;

    /// Transactions for an account, oldest first
    async fn transactions_by_account(&self, account_id: AccountId) -> Result<Vec<Transaction>>;
}
