//! Identity token claims

use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Claims embedded in a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id
    pub sub: UserId,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds); `None` means the token never expires
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if now >= exp)
    }
}
