//! Auth service - registration, login and token resolution

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthPayload, NewUser, Registration, UserId};
use crate::ports::CredentialStore;

use super::password::PasswordService;
use super::token::TokenSigner;

/// Service for user identity
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    passwords: Arc<PasswordService>,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        passwords: PasswordService,
        tokens: TokenSigner,
    ) -> Self {
        Self {
            credentials,
            passwords: Arc::new(passwords),
            tokens,
        }
    }

    /// Create a user and return a token for them
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthPayload> {
        Registration { username, email, password }.validate()?;

        let password_hash = self.hash_password(password).await?;
        let user = self
            .credentials
            .create_user(&NewUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password_hash,
            })
            .await?;

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(AuthPayload { token, user })
    }

    /// Check credentials and return a fresh token
    ///
    /// Unknown usernames are `NotFound` and wrong passwords are `Auth`;
    /// outer surfaces may collapse the two.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthPayload> {
        let credentials = self
            .credentials
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;

        if !self
            .verify_password(password, &credentials.password_hash)
            .await?
        {
            tracing::warn!(user_id = credentials.user.id, "login rejected: wrong password");
            return Err(Error::auth("invalid credentials"));
        }

        let token = self.tokens.issue(credentials.user.id)?;
        tracing::debug!(user_id = credentials.user.id, "user logged in");
        Ok(AuthPayload {
            token,
            user: credentials.user,
        })
    }

    /// Resolve a bearer token; `None` means anonymous
    pub fn verify_token(&self, token: &str) -> Option<UserId> {
        self.tokens.verify(token)
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let passwords = Arc::clone(&self.passwords);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || passwords.hash(&password)).await?
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let passwords = Arc::clone(&self.passwords);
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &stored_hash)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use crate::config::Argon2Params;

    fn service() -> AuthService {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        AuthService::new(
            Arc::new(store),
            PasswordService::new(&Argon2Params { time_cost: 1, memory_cost: 8, parallelism: 1 })
                .unwrap(),
            TokenSigner::new(b"auth-service-test-secret-0123456789abcdef", None).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let registered = auth.register("alice", "alice@example.com", "pw1").await.unwrap();
        assert_eq!(registered.user.username, "alice");
        assert_eq!(auth.verify_token(&registered.token), Some(registered.user.id));

        let logged_in = auth.login("alice", "pw1").await.unwrap();
        assert_eq!(logged_in.user, registered.user);
        assert_eq!(auth.verify_token(&logged_in.token), Some(registered.user.id));
    }

    #[tokio::test]
    async fn test_login_failures_are_distinct() {
        let auth = service();
        auth.register("bob", "bob@example.com", "right").await.unwrap();

        assert!(matches!(auth.login("bob", "wrong").await, Err(Error::Auth(_))));
        assert!(matches!(auth.login("nobody", "right").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_validates_and_detects_duplicates() {
        let auth = service();
        assert!(matches!(
            auth.register("", "x@example.com", "pw").await,
            Err(Error::Validation(_))
        ));

        auth.register("carol", "c@example.com", "pw").await.unwrap();
        assert!(matches!(
            auth.register("carol", "other@example.com", "pw").await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_anonymous() {
        assert_eq!(service().verify_token("garbage"), None);
    }
}
