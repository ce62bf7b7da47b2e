//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod money;
mod token;
mod transaction;
mod user;
pub mod result;

pub use account::{Account, AccountId, OverdraftPolicy};
pub use money::Money;
pub use token::TokenClaims;
pub use transaction::{
    signed_amount, NewTransaction, Transaction, TransactionId, DEPOSIT, WITHDRAWAL,
};
pub use user::{AuthPayload, NewUser, Registration, User, UserCredentials, UserId};
