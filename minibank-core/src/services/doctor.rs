//! Doctor service - ledger health checks

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::result::Result;

/// Doctor service for health checks
pub struct DoctorService {
    store: Arc<DuckDbStore>,
}

impl DoctorService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Run all health checks
    pub async fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();

        // Ledger-balance invariant
        let mismatches = self.store.balance_mismatches().await?;
        let details: Vec<serde_json::Value> = mismatches
            .iter()
            .map(|m| {
                json!({
                    "account_id": m.account_id,
                    "balance": m.balance,
                    "transaction_sum": m.transaction_sum,
                })
            })
            .collect();
        checks.insert(
            "balance_invariant".to_string(),
            CheckResult::from_findings(
                details,
                CheckStatus::Error,
                "Every balance matches its transaction history",
                |n| format!("{} account(s) have a balance that differs from their transactions", n),
            ),
        );

        // Orphaned transactions
        let orphaned = self.store.orphaned_transactions().await?;
        let details = orphaned
            .iter()
            .map(|id| json!({ "transaction_id": id }))
            .collect();
        checks.insert(
            "orphaned_transactions".to_string(),
            CheckResult::from_findings(
                details,
                CheckStatus::Error,
                "No orphaned transactions found",
                |n| format!("{} transaction(s) reference missing accounts", n),
            ),
        );

        // Zero-amount rows can't be created through the service
        let zero = self.store.zero_amount_transactions().await?;
        checks.insert(
            "zero_amount_transactions".to_string(),
            if zero == 0 {
                CheckResult::pass("No zero-amount transactions found")
            } else {
                CheckResult {
                    status: CheckStatus::Warning,
                    message: format!("{} transaction(s) have an amount of zero", zero),
                    details: None,
                }
            },
        );

        let count = |status: CheckStatus| checks.values().filter(|c| c.status == status).count() as i64;
        let summary = DoctorSummary {
            passed: count(CheckStatus::Pass),
            warnings: count(CheckStatus::Warning),
            errors: count(CheckStatus::Error),
        };

        if summary.errors > 0 {
            tracing::error!(errors = summary.errors, "ledger health check failed");
        }

        Ok(DoctorResult { checks, summary })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

impl DoctorResult {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn pass(message: &str) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.to_string(),
            details: None,
        }
    }

    fn from_findings(
        findings: Vec<serde_json::Value>,
        failing: CheckStatus,
        ok_message: &str,
        describe: impl FnOnce(usize) -> String,
    ) -> Self {
        if findings.is_empty() {
            return Self::pass(ok_message);
        }
        Self {
            status: failing,
            message: describe(findings.len()),
            details: Some(findings),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
