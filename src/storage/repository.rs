use anyhow::Context;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{check_quota, SlotStore, StorageError, MIGRATION_001_SLOTS};

/// SQLite-backed slot storage: one row per slot in the `slots` table.
pub struct SlotRepository {
    pool: SqlitePool,
    quota: Option<usize>,
}

impl SlotRepository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, quota: None }
    }

    /// Limit the total bytes (keys plus values) stored across all slots.
    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota = bytes;
        self
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(MIGRATION_001_SLOTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Bytes used by every slot except `key`.
    async fn bytes_used_by_others(&self, key: &str) -> anyhow::Result<usize> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) AS used
            FROM slots
            WHERE key != ?
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .context("Failed to measure slot usage")?;

        let used: i64 = row.get("used");
        Ok(usize::try_from(used).unwrap_or(0))
    }
}

impl SlotStore for SlotRepository {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read slot '{}'", key))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.quota.is_some() {
            let others = self.bytes_used_by_others(key).await?;
            check_quota(key, value, others, self.quota)?;
        }

        sqlx::query(
            r#"
            INSERT INTO slots (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write slot '{}'", key))?;

        debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }
}
