use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{migrations, MirrorStore};

const IN_MEMORY_PATH: &str = ":memory:";

/// Durable store backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and run migrations.
    ///
    /// The path `:memory:` opens a private in-memory database held on a
    /// single connection for the life of the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = if path.as_os_str() == IN_MEMORY_PATH {
            // Every SQLite connection to :memory: sees its own database.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .context("Invalid in-memory database options")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .context("Failed to open in-memory state database")?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(10));

            SqlitePoolOptions::new()
                .max_connections(2)
                .connect_with(options)
                .await
                .with_context(|| format!("Failed to open state database: {}", path.display()))?
        };

        migrations::run(&pool).await?;
        info!(path = %path.display(), "State database ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl MirrorStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM mirror_state WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read state key {key}"))?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl
            .map(|ttl| i64::try_from(ttl.as_millis()).map(|ms| Utc::now().timestamp_millis() + ms))
            .transpose()
            .context("State TTL out of range")?;

        sqlx::query(
            r"
            INSERT INTO mirror_state (key, value, expires_at, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write state key {key}"))?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM mirror_state WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to purge expired state")?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Purged expired mirror state");
        }
        Ok(removed)
    }
}
