//! Transaction service - accounts and balance movements

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountId, Money, NewTransaction, OverdraftPolicy, Transaction, UserId};
use crate::ports::LedgerStore;

/// Service for account and transaction operations
///
/// Every operation takes the caller identity as `Option<UserId>`; `None`
/// (anonymous) is rejected with `Error::Auth`.
pub struct TransactionService {
    ledger: Arc<dyn LedgerStore>,
    overdraft: OverdraftPolicy,
}

impl TransactionService {
    pub fn new(ledger: Arc<dyn LedgerStore>, overdraft: OverdraftPolicy) -> Self {
        Self { ledger, overdraft }
    }

    pub async fn create_account(&self, user_id: Option<UserId>, account_type: &str) -> Result<Account> {
        let user_id = require_user(user_id)?;
        let account = self.ledger.create_account(user_id, account_type).await?;
        tracing::info!(user_id, account_id = account.id, "account created");
        Ok(account)
    }

    pub async fn list_accounts(&self, user_id: Option<UserId>) -> Result<Vec<Account>> {
        let user_id = require_user(user_id)?;
        self.ledger.accounts_by_owner(user_id).await
    }

    /// Move money in or out of an account the caller owns
    ///
    /// `amount` is the positive magnitude; the sign comes from
    /// `transaction_type`.
    pub async fn perform_transaction(
        &self,
        user_id: Option<UserId>,
        account_id: AccountId,
        amount: Money,
        transaction_type: &str,
        description: Option<&str>,
    ) -> Result<Transaction> {
        let user_id = require_user(user_id)?;
        let entry = NewTransaction::from_request(account_id, amount, transaction_type, description)?;
        self.owned_account(user_id, account_id).await?;

        let tx = self
            .ledger
            .apply_transaction(&entry, self.overdraft)
            .await
            .map_err(|e| {
                tracing::warn!(user_id, account_id, kind = ?e.kind(), "transaction rejected");
                e
            })?;

        tracing::info!(
            user_id,
            account_id,
            transaction_id = tx.id,
            amount = tx.amount.minor_units(),
            "transaction applied"
        );
        Ok(tx)
    }

    /// Transaction history for an account the caller owns, oldest first
    pub async fn account_transactions(
        &self,
        user_id: Option<UserId>,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let user_id = require_user(user_id)?;
        self.owned_account(user_id, account_id).await?;
        self.ledger.transactions_by_account(account_id).await
    }

    async fn owned_account(&self, user_id: UserId, account_id: AccountId) -> Result<Account> {
        let account = self
            .ledger
            .find_account(account_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("account {} not found", account_id)))?;

        if !account.is_owned_by(user_id) {
            tracing::warn!(user_id, account_id, "access to foreign account denied");
            return Err(Error::auth("account does not belong to the current user"));
        }
        Ok(account)
    }
}

fn require_user(user_id: Option<UserId>) -> Result<UserId> {
    user_id.ok_or_else(|| Error::auth("user not authenticated"))
}
