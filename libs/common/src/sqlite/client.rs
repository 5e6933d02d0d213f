use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool as SqlxSqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub type SqlitePool = SqlxSqlitePool;

#[derive(Clone)]
pub struct SqliteClient {
    pool: Arc<SqlitePool>,
    db_path: String,
}

impl SqliteClient {
    /// Open (or create) a file-backed database with WAL and foreign keys enabled
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        // foreign_keys is a per-connection pragma, so it goes on the connect options
        // rather than a one-off query against the pool
        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", db_path_str))?;

        info!(
            "SQLite database connected with foreign keys enabled: {}",
            db_path_str
        );

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path_str,
        })
    }

    /// Private in-memory database on a single pinned connection
    ///
    /// Every pooled connection to `:memory:` would see its own empty database,
    /// so the pool is capped at one connection that never idles out.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Ok(Self {
            pool: Arc::new(pool),
            db_path: ":memory:".to_string(),
        })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }
}
