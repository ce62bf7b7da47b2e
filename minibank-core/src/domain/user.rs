//! User domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

pub type UserId = i64;

/// A registered user as seen by the rest of the system
///
/// Never carries the password hash; see [`UserCredentials`] for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }
}

/// A user row together with its stored password hash
///
/// Only the auth service and the credential store handle this type.
#[derive(Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

// Keep the hash out of debug output and logs
impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user", &self.user)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Input for creating a user in the credential store
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Registration input, validated before any hashing happens
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> Registration<'a> {
    /// Reject empty fields. Username and email are trimmed; the password is
    /// taken verbatim, so whitespace-only passwords are accepted.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::validation("username cannot be empty"));
        }
        if self.email.trim().is_empty() {
            return Err(Error::validation("email cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::validation("password cannot be empty"));
        }
        Ok(())
    }
}

/// Token and user returned by register and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new(7, "alice", "a@x.com");
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
    }

    #[test]
    fn test_registration_rejects_empty_fields() {
        let ok = Registration { username: "alice", email: "a@x.com", password: "pw1" };
        assert!(ok.validate().is_ok());

        let no_user = Registration { username: "  ", email: "a@x.com", password: "pw1" };
        assert!(matches!(no_user.validate(), Err(Error::Validation(_))));

        let no_email = Registration { username: "alice", email: "", password: "pw1" };
        assert!(matches!(no_email.validate(), Err(Error::Validation(_))));

        let no_password = Registration { username: "alice", email: "a@x.com", password: "" };
        assert!(matches!(no_password.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_whitespace_password_is_kept() {
        let spaces = Registration { username: "alice", email: "a@x.com", password: "   " };
        assert!(spaces.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_hash() {
        let creds = UserCredentials {
            user: User::new(1, "alice", "a@x.com"),
            password_hash: "$argon2id$v=19$secret".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("argon2id"));
        assert!(printed.contains("redacted"));
    }
}
