//! Account domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::money::Money;
use super::user::UserId;

pub type AccountId = i64;

/// An account holding money for one owner
/// Note: account_type is a freeform label chosen by the caller
/// ("savings", "checking", ...); it is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: UserId,
    pub account_type: String,
    /// Mutated only by applying a transaction
    pub balance: Money,
}

impl Account {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

/// Whether a debit may take an account below zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdraftPolicy {
    /// Balances may go negative
    Allow,
    /// Debits that would leave a negative balance fail with a validation error
    #[default]
    Reject,
}

impl OverdraftPolicy {
    pub fn allows_negative(&self) -> bool {
        matches!(self, OverdraftPolicy::Allow)
    }
}

impl FromStr for OverdraftPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(OverdraftPolicy::Allow),
            "reject" => Ok(OverdraftPolicy::Reject),
            other => Err(format!("unknown overdraft policy '{}' (expected allow or reject)", other)),
        }
    }
}

impl fmt::Display for OverdraftPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverdraftPolicy::Allow => write!(f, "allow"),
            OverdraftPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership() {
        let account = Account {
            id: 1,
            owner_id: 10,
            account_type: "savings".to_string(),
            balance: Money::ZERO,
        };
        assert!(account.is_owned_by(10));
        assert!(!account.is_owned_by(11));
    }

    #[test]
    fn test_overdraft_policy_parsing() {
        assert_eq!("allow".parse::<OverdraftPolicy>(), Ok(OverdraftPolicy::Allow));
        assert_eq!(" REJECT ".parse::<OverdraftPolicy>(), Ok(OverdraftPolicy::Reject));
        assert!("maybe".parse::<OverdraftPolicy>().is_err());
        assert_eq!(OverdraftPolicy::default(), OverdraftPolicy::Reject);
        assert!(OverdraftPolicy::Allow.allows_negative());
    }
}
