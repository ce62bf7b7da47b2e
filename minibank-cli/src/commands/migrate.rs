//! Migrate command - apply pending schema migrations

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use super::{load_config, open_store};
use crate::output;

pub fn run(data_dir: &Path, json: bool) -> Result<()> {
    let config = load_config(data_dir)?;
    let store = open_store(data_dir, &config)?;
    let result = store.run_migrations().context("Migration failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "applied": result.applied,
                "already_applied": result.already_applied,
            }))?
        );
        return Ok(());
    }

    if result.applied.is_empty() {
        output::info(&format!(
            "Schema is up to date ({} migrations applied)",
            result.already_applied
        ));
    } else {
        for name in &result.applied {
            println!("  applied {}", name);
        }
        output::success(&format!("Applied {} migration(s)", result.applied.len()));
    }

    Ok(())
}
