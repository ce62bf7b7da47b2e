//! Transaction domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::money::Money;
use super::result::{Error, Result};

pub type TransactionId = i64;

/// The only type label that credits an account; every other label debits it
pub const DEPOSIT: &str = "deposit";

/// Conventional label for debits
pub const WITHDRAWAL: &str = "withdrawal";

/// An immutable record of one balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Signed: positive for deposits, negative for everything else
    pub amount: Money,
    pub transaction_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated balance change waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Money,
    pub transaction_type: String,
    pub description: Option<String>,
}

impl NewTransaction {
    /// Build a transaction from a caller request
    ///
    /// `magnitude` must be strictly positive; the sign is derived from
    /// `transaction_type` and never trusted from the caller. Blank
    /// descriptions are stored as `None`.
    pub fn from_request(
        account_id: AccountId,
        magnitude: Money,
        transaction_type: &str,
        description: Option<&str>,
    ) -> Result<Self> {
        let amount = signed_amount(magnitude, transaction_type)?;
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            account_id,
            amount,
            transaction_type: transaction_type.to_string(),
            description,
        })
    }
}

/// Compute the signed delta for a requested movement
///
/// Exactly `deposit` credits (+magnitude); any other label, including an
/// empty one, debits (-magnitude).
pub fn signed_amount(magnitude: Money, transaction_type: &str) -> Result<Money> {
    if !magnitude.is_positive() {
        return Err(Error::validation(
            "amount must be a positive number of minor units",
        ));
    }
    if transaction_type == DEPOSIT {
        Ok(magnitude)
    } else {
        Ok(-magnitude)
    }
}
