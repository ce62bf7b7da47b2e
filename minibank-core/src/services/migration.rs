//! Migration service - applies the embedded schema migrations
//!
//! Each migration runs in its own database transaction together with the
//! row that records it in `sys_migrations`, so a failed migration leaves no
//! partial schema behind and is retried on the next start.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for managing database migrations
pub struct MigrationService<'a> {
    conn: &'a mut Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Run all pending migrations in name order
    pub fn run_pending(&mut self) -> Result<MigrationResult> {
        // The bootstrap file is idempotent (CREATE TABLE IF NOT EXISTS)
        let (_, bootstrap_sql) = MIGRATIONS
            .iter()
            .find(|(name, _)| *name == BOOTSTRAP)
            .context("bootstrap migration missing")?;
        self.conn.execute_batch(bootstrap_sql)?;

        let applied_before = self.get_applied()?;
        let mut applied = Vec::new();

        for (name, sql) in MIGRATIONS.iter() {
            if applied_before.iter().any(|a| a == name) {
                continue;
            }

            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)
                .with_context(|| format!("migration {} failed", name))?;
            tx.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
            tx.commit()?;

            tracing::info!(migration = %name, "applied migration");
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied: applied_before.len(),
        })
    }

    /// Names of applied migrations
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}
