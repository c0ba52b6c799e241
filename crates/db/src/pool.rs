//! Database connection pool management.

use crate::error::{StoreError, StoreResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

/// Maximum pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 10;

/// Database connection pool wrapper.
///
/// Cloning is cheap; every clone shares the same underlying pool, so one
/// `DbPool` opened at startup can be handed to every source store.
#[derive(Clone)]
pub struct DbPool {
    pool: SqlitePool,
}

impl DbPool {
    /// Create a new database pool from a SQLite database path.
    ///
    /// `":memory:"` opens a private in-memory database. It is served by a
    /// single connection that is never recycled, so the data lives as long
    /// as the pool does.
    pub async fn new(db_path: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let in_memory = db_path.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;

        info!("Connected to database at {}", db_path);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run the embedded migrations that set up the source registry.
    ///
    /// Per-source tables are created later, when a source store is opened.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close every connection in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
