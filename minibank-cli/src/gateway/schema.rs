//! GraphQL schema: object types and resolvers
//!
//! Resolvers stay thin. They pull the shared [`BankContext`] and the caller's
//! [`RequestContext`] out of the GraphQL context, call one service method and
//! convert the result.

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Object, Schema, SimpleObject};
use minibank_core::domain::Transaction;
use minibank_core::{Account, AuthPayload, BankContext, Money, User, UserId};

use super::error::{account_error, login_error, to_graphql_error};

pub type BankSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Per-request caller identity, resolved from the Authorization header
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    pub user_id: Option<UserId>,
}

pub fn build_schema(bank: Arc<BankContext>) -> BankSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(bank)
        .finish()
}

fn bank<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a Arc<BankContext>> {
    ctx.data::<Arc<BankContext>>()
}

fn caller(ctx: &Context<'_>) -> Option<UserId> {
    ctx.data_opt::<RequestContext>().and_then(|rc| rc.user_id)
}

// ---------------------------------------------------------------------------
// Object types
// ---------------------------------------------------------------------------

#[derive(SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserObject {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AuthPayload")]
pub struct AuthPayloadObject {
    pub token: String,
    pub user: UserObject,
}

impl From<AuthPayload> for AuthPayloadObject {
    fn from(payload: AuthPayload) -> Self {
        Self {
            token: payload.token,
            user: payload.user.into(),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Account")]
pub struct AccountObject {
    pub id: i64,
    #[graphql(name = "account_type")]
    pub account_type: String,
    /// Minor units
    pub balance: i64,
}

impl From<Account> for AccountObject {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_type: account.account_type,
            balance: account.balance.minor_units(),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Transaction")]
pub struct TransactionObject {
    pub id: i64,
    /// Signed minor units: positive credits, negative debits
    pub amount: i64,
    #[graphql(name = "transaction_type")]
    pub transaction_type: String,
    pub description: Option<String>,
}

impl From<Transaction> for TransactionObject {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount.minor_units(),
            transaction_type: tx.transaction_type,
            description: tx.description,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn hello(&self) -> &'static str {
        "Hello world!"
    }

    /// Accounts owned by the caller
    async fn get_user_accounts(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<AccountObject>> {
        let accounts = bank(ctx)?
            .transaction_service
            .list_accounts(caller(ctx))
            .await
            .map_err(to_graphql_error)?;
        Ok(accounts.into_iter().map(Into::into).collect())
    }

    /// Transaction history of one of the caller's accounts, oldest first
    async fn get_account_transactions(
        &self,
        ctx: &Context<'_>,
        account_id: i64,
    ) -> async_graphql::Result<Vec<TransactionObject>> {
        let txs = bank(ctx)?
            .transaction_service
            .account_transactions(caller(ctx), account_id)
            .await
            .map_err(account_error)?;
        Ok(txs.into_iter().map(Into::into).collect())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn register(
        &self,
        ctx: &Context<'_>,
        username: String,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayloadObject> {
        bank(ctx)?
            .auth_service
            .register(&username, &email, &password)
            .await
            .map(Into::into)
            .map_err(to_graphql_error)
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> async_graphql::Result<AuthPayloadObject> {
        bank(ctx)?
            .auth_service
            .login(&username, &password)
            .await
            .map(Into::into)
            .map_err(login_error)
    }

    async fn create_account(
        &self,
        ctx: &Context<'_>,
        account_type: String,
    ) -> async_graphql::Result<AccountObject> {
        bank(ctx)?
            .transaction_service
            .create_account(caller(ctx), &account_type)
            .await
            .map(Into::into)
            .map_err(to_graphql_error)
    }

    /// `amount` is a positive number of minor units; `type` "deposit"
    /// credits the account and any other type debits it
    async fn perform_transaction(
        &self,
        ctx: &Context<'_>,
        account_id: i64,
        amount: i64,
        #[graphql(name = "type")] transaction_type: String,
        description: Option<String>,
    ) -> async_graphql::Result<TransactionObject> {
        bank(ctx)?
            .transaction_service
            .perform_transaction(
                caller(ctx),
                account_id,
                Money::from_minor(amount),
                &transaction_type,
                description.as_deref(),
            )
            .await
            .map(Into::into)
            .map_err(account_error)
    }
}
