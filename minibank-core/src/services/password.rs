//! Password hashing with Argon2id
//!
//! Hashes are stored as PHC strings, which embed the algorithm, cost
//! parameters and salt. Verification reads parameters from the stored hash,
//! so changing the configured costs only affects new registrations.

use argon2::password_hash::{
    Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::config::Argon2Params;
use crate::domain::result::{Error, Result};

/// Hashes and verifies passwords
///
/// Both operations are CPU-heavy; async callers should run them on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(params: &Argon2Params) -> Result<Self> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            None,
        )
        .map_err(|e| Error::validation(format!("invalid password hashing parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt_bytes: [u8; 16] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::store(format!("failed to encode salt: {}", e)))?;

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::store(format!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on a wrong password; `Err` only if the stored hash is
    /// unreadable
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::store(format!("stored password hash is malformed: {}", e)))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(Error::store(format!("password verification failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordService {
        PasswordService::new(&Argon2Params {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let service = fast();
        let hash = service.hash("hunter2").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(service.verify("hunter2", &hash).unwrap());
        assert!(!service.verify("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let service = fast();
        let a = service.hash("same").unwrap();
        let b = service.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(matches!(
            fast().verify("pw", "plaintext"),
            Err(Error::Store(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordService::new(&Argon2Params {
            time_cost: 0,
            memory_cost: 8,
            parallelism: 1,
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
