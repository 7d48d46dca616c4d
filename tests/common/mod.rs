// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use exptrak::application::ExpenseStore;
use exptrak::config::Config;
use exptrak::domain::{Category, Cents, NewExpense};
use exptrak::storage::SlotRepository;
use tempfile::TempDir;

/// Config pointing at a database inside a fresh temporary directory.
pub fn test_config() -> Result<(Config, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let config = Config {
        database: db_path.to_string_lossy().into_owned(),
        quota_bytes: None,
    };
    Ok((config, temp_dir))
}

/// Helper to create a store over a temporary SQLite database
pub async fn test_store() -> Result<(ExpenseStore<SlotRepository>, Config, TempDir)> {
    let (config, temp_dir) = test_config()?;
    config.init_storage().await?;
    let store = config.open_store().await?;
    Ok((store, config, temp_dir))
}

/// Simulate a restart: open a second store on the same database.
pub async fn reopen(config: &Config) -> Result<ExpenseStore<SlotRepository>> {
    config.open_store().await
}

pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn expense(amount: Cents, category: Category, date: &str) -> NewExpense {
    NewExpense::new(amount, category, parse_date(date))
}
