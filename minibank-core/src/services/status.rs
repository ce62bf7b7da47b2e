//! Status service - ledger summary

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::result::Result;

/// Status service for ledger summaries
pub struct StatusService {
    store: Arc<DuckDbStore>,
}

impl StatusService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Get overall status summary
    pub async fn get_status(&self) -> Result<StatusSummary> {
        let totals = self.store.totals().await?;

        Ok(StatusSummary {
            database: self
                .store
                .db_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            total_users: totals.users,
            total_accounts: totals.accounts,
            total_transactions: totals.transactions,
            total_balance: totals.total_balance,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub database: String,
    pub total_users: i64,
    pub total_accounts: i64,
    pub total_transactions: i64,
    /// Sum of all balances, in minor units
    pub total_balance: i128,
}
