//! Configuration management
//!
//! Settings live in an optional `settings.json` inside the data directory:
//! ```json
//! {
//!   "auth": { "tokenTtlSecs": 86400, "passwordHashing": { "memoryCost": 19456 } },
//!   "ledger": { "overdraft": "reject" },
//!   "database": { "file": "minibank.duckdb" }
//! }
//! ```
//! Environment variables override the file: `JWT_SECRET`, `TOKEN_TTL_SECS`,
//! `OVERDRAFT_POLICY`, `MINIBANK_DB`. The token secret is normally
//! supplied only through the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::OverdraftPolicy;

/// Default token lifetime: one day
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// Default Argon2id parameters (19 MiB, two passes, one lane)
pub const DEFAULT_TIME_COST: u32 = 2;
pub const DEFAULT_MEMORY_COST: u32 = 19_456;
pub const DEFAULT_PARALLELISM: u32 = 1;

const DEFAULT_DB_FILE: &str = "minibank.duckdb";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(default)]
    database: DatabaseSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_secret: Option<String>,
    #[serde(default)]
    token_ttl_secs: Option<u64>,
    #[serde(default)]
    password_hashing: Option<Argon2Params>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default)]
    overdraft: Option<OverdraftPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default)]
    file: Option<String>,
}

/// Argon2id cost parameters for password hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Argon2Params {
    pub time_cost: u32,
    /// Memory in KiB
    pub memory_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// Minibank configuration
#[derive(Clone)]
pub struct Config {
    /// HMAC key for identity tokens; required to serve requests
    pub token_secret: Option<String>,
    /// 0 means tokens never expire
    pub token_ttl_secs: u64,
    pub overdraft: OverdraftPolicy,
    pub password_hashing: Argon2Params,
    /// Database file, relative to the data directory unless absolute
    pub database_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            overdraft: OverdraftPolicy::default(),
            password_hashing: Argon2Params::default(),
            database_file: DEFAULT_DB_FILE.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("overdraft", &self.overdraft)
            .field("password_hashing", &self.password_hashing)
            .field("database_file", &self.database_file)
            .finish()
    }
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::from_settings_file(data_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load only settings.json (missing file means defaults)
    pub fn from_settings_file(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let defaults = Self::default();
        Ok(Self {
            token_secret: raw.auth.token_secret,
            token_ttl_secs: raw.auth.token_ttl_secs.unwrap_or(defaults.token_ttl_secs),
            overdraft: raw.ledger.overdraft.unwrap_or(defaults.overdraft),
            password_hashing: raw.auth.password_hashing.unwrap_or(defaults.password_hashing),
            database_file: raw.database.file.unwrap_or(defaults.database_file),
        })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.token_secret = Some(secret);
        }
        if let Some(ttl) = lookup("TOKEN_TTL_SECS") {
            self.token_ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("TOKEN_TTL_SECS must be a whole number, got '{}'", ttl))?;
        }
        if let Some(policy) = lookup("OVERDRAFT_POLICY") {
            self.overdraft = policy.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(file) = lookup("MINIBANK_DB").filter(|s| !s.is_empty()) {
            self.database_file = file;
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Option<Duration> {
        match self.token_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_settings_file(dir.path()).unwrap();
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.overdraft, OverdraftPolicy::Reject);
        assert_eq!(config.database_file, "minibank.duckdb");
        assert!(config.token_secret.is_none());
    }

    #[test]
    fn test_settings_file_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "auth": { "tokenTtlSecs": 0, "passwordHashing": { "memoryCost": 64 } },
                "ledger": { "overdraft": "allow" },
                "ui": { "theme": "dark" }
            }"#,
        )
        .unwrap();

        let config = Config::from_settings_file(dir.path()).unwrap();
        assert_eq!(config.token_ttl(), None);
        assert_eq!(config.overdraft, OverdraftPolicy::Allow);
        assert_eq!(config.password_hashing.memory_cost, 64);
        assert_eq!(config.password_hashing.time_cost, DEFAULT_TIME_COST);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
                ("TOKEN_TTL_SECS", "60"),
                ("OVERDRAFT_POLICY", "allow"),
            ]))
            .unwrap();
        assert_eq!(config.token_secret.as_deref(), Some("0123456789abcdef0123456789abcdef"));
        assert_eq!(config.token_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(config.overdraft, OverdraftPolicy::Allow);
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let mut config = Config::default();
        assert!(config.apply_overrides(env(&[("TOKEN_TTL_SECS", "soon")])).is_err());
        assert!(config.apply_overrides(env(&[("OVERDRAFT_POLICY", "sometimes")])).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config {
            token_secret: Some("super-secret-value".to_string()),
            ..Config::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret-value"));
    }
}
