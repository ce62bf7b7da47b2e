//! Token service - signs and verifies bearer tokens
//!
//! A token is `base64url(claims) "." base64url(hmac_sha256(claims_b64))`,
//! both parts unpadded. The payload is plain JSON so it stays readable while
//! debugging; only the signature protects it.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::result::{Error, Result};
use crate::domain::{TokenClaims, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

const BEARER_PREFIX: &str = "Bearer ";

/// Issues and verifies HMAC-signed identity tokens
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Option<Duration>,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// `ttl = None` issues tokens without an expiry
    pub fn new(secret: &[u8], ttl: Option<Duration>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::validation(format!(
                "token secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| Error::validation(format!("invalid token secret: {}", e)))?;
        Ok(Self { mac, ttl })
    }

    pub fn issue(&self, user_id: UserId) -> Result<String> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    pub fn issue_at(&self, user_id: UserId, now: i64) -> Result<String> {
        let claims = TokenClaims {
            sub: user_id,
            iat: now,
            exp: self
                .ttl
                .map(|ttl| now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| Error::store(format!("failed to encode token claims: {}", e)))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(payload_b64.as_bytes());

        Ok(format!("{}.{}", payload_b64, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Resolve a token to its user id
    ///
    /// Returns `None` for anything malformed, tampered with or expired. A
    /// leading `Bearer ` is accepted so raw header values can be passed in.
    pub fn verify(&self, token: &str) -> Option<UserId> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Option<UserId> {
        let token = token.trim();
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();
        let (payload_b64, signature_b64) = token.split_once('.')?;

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        let mut mac = self.mac.clone();
        mac.update(payload_b64.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&payload).ok()?;
        if claims.is_expired_at(now) {
            return None;
        }
        Some(claims.sub)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}
