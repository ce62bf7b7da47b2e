//! CLI command implementations

pub mod doctor;
pub mod migrate;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use minibank_core::adapters::duckdb::DuckDbStore;
use minibank_core::config::Config;

/// Resolve the data directory: `--dir` / `MINIBANK_DIR`, else `~/.minibank`
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::home_dir()
            .map(|home| home.join(".minibank"))
            .context("Could not find home directory; pass --dir"),
    }
}

/// Load settings.json from the data directory plus environment overrides
pub fn load_config(data_dir: &Path) -> Result<Config> {
    Config::load(data_dir).context("Failed to load configuration")
}

/// Open the database without building request services
///
/// Operator commands use this so they work without a token secret.
pub fn open_store(data_dir: &Path, config: &Config) -> Result<Arc<DuckDbStore>> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let db_path = config.database_path(data_dir);
    let store = DuckDbStore::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(Arc::new(store))
}
