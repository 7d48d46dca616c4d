//! Runtime configuration resolved from command-line flags and environment.

use anyhow::Result;

use crate::application::ExpenseStore;
use crate::storage::SlotRepository;

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "exptrak.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the SQLite database holding the slots
    pub database: String,
    /// Upper bound on stored bytes; `None` means unlimited
    pub quota_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            quota_bytes: None,
        }
    }
}

impl Config {
    /// URL that creates the database file when missing.
    pub fn create_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database)
    }

    /// URL for an existing database.
    pub fn connect_url(&self) -> String {
        format!("sqlite:{}", self.database)
    }

    /// Create the database and its tables.
    pub async fn init_storage(&self) -> Result<SlotRepository> {
        let repo = SlotRepository::init(&self.create_url()).await?;
        Ok(repo.with_quota(self.quota_bytes))
    }

    /// Open the expense store on an existing database.
    pub async fn open_store(&self) -> Result<ExpenseStore<SlotRepository>> {
        let repo = SlotRepository::connect(&self.connect_url())
            .await?
            .with_quota(self.quota_bytes);
        repo.migrate().await?;
        Ok(ExpenseStore::open(repo).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = Config {
            database: "/tmp/x.db".into(),
            quota_bytes: None,
        };
        assert_eq!(config.create_url(), "sqlite:/tmp/x.db?mode=rwc");
        assert_eq!(config.connect_url(), "sqlite:/tmp/x.db");
        assert_eq!(Config::default().database, DEFAULT_DATABASE);
    }
}
