//! Status command - show ledger summary

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use minibank_core::services::StatusService;

use super::{load_config, open_store};
use crate::output;

pub async fn run(data_dir: &Path, json: bool) -> Result<()> {
    let config = load_config(data_dir)?;
    let store = open_store(data_dir, &config)?;
    store.ensure_schema()?;

    let status = StatusService::new(store).get_status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Database", &status.database]);
    table.add_row(vec!["Users", &status.total_users.to_string()]);
    table.add_row(vec!["Accounts", &status.total_accounts.to_string()]);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec!["Total balance", &output::format_money(status.total_balance)]);
    table.add_row(vec!["Overdraft policy", &config.overdraft.to_string()]);

    println!("{}", table);

    Ok(())
}
