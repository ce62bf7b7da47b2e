//! Minibank Core - Business logic for a small multi-user ledger
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Account, Transaction, Money)
//! - **ports**: Trait definitions for storage (CredentialStore, LedgerStore)
//! - **services**: Business logic orchestration (auth, transactions, health)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountId, AuthPayload, Money, OverdraftPolicy, Transaction, User, UserId,
};
pub use domain::result::{Error, ErrorKind};

/// Main context for Minibank operations
///
/// Built once at startup and shared by every request. It holds the store,
/// the configuration and all services.
pub struct BankContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub auth_service: AuthService,
    pub transaction_service: TransactionService,
    pub status_service: StatusService,
    pub doctor_service: DoctorService,
}

impl BankContext {
    /// Open the database in `data_dir` and build all services
    pub fn open(data_dir: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let db_path = config.database_path(data_dir);
        let store = DuckDbStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        Self::with_store(config, Arc::new(store))
    }

    /// Build services around an existing store (in-memory in tests)
    pub fn with_store(config: Config, store: Arc<DuckDbStore>) -> Result<Self> {
        store.ensure_schema().context("Failed to apply migrations")?;

        let secret = config
            .token_secret
            .as_deref()
            .context("JWT_SECRET is not set")?;
        let tokens = TokenSigner::new(secret.as_bytes(), config.token_ttl())?;
        let passwords = PasswordService::new(&config.password_hashing)?;

        let auth_service = AuthService::new(store.clone(), passwords, tokens);
        let transaction_service = TransactionService::new(store.clone(), config.overdraft);
        let status_service = StatusService::new(Arc::clone(&store));
        let doctor_service = DoctorService::new(Arc::clone(&store));

        Ok(Self {
            config,
            store,
            auth_service,
            transaction_service,
            status_service,
            doctor_service,
        })
    }
}
