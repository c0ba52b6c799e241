//! Per-source schema.
//!
//! Every source gets its own pair of tables:
//! - `covid19_<source>_entry`: id, timestamp
//! - `covid19_<source>`: entry_id, state_code, confirmed, active, deaths,
//!   recovered, indians, foreigners
//!
//! The registry table itself comes from the embedded sqlx migrations.

use crate::error::{StoreError, StoreResult};
use sqlx::SqlitePool;
use tracing::debug;

const MAX_SOURCE_NAME_LEN: usize = 48;

/// Table names owned by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTables {
    pub cases: String,
    pub entry: String,
}

impl SourceTables {
    /// Derive the table names for a source.
    ///
    /// The name is spliced into SQL identifiers, so only lowercase ASCII
    /// letters, digits and underscores are accepted.
    pub fn for_source(source: &str) -> StoreResult<Self> {
        validate_source_name(source)?;
        let cases = format!("covid19_{source}");
        let entry = format!("{cases}_entry");
        Ok(Self { cases, entry })
    }
}

/// Check that a source name is usable as part of a table name.
pub fn validate_source_name(source: &str) -> StoreResult<()> {
    let valid = !source.is_empty()
        && source.len() <= MAX_SOURCE_NAME_LEN
        && source
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSourceName(source.to_string()))
    }
}

/// Create the tables of a source if they do not exist yet and record the
/// source in the registry.
pub async fn ensure_source_tables(pool: &SqlitePool, source: &str) -> StoreResult<SourceTables> {
    let tables = SourceTables::for_source(source)?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {entry} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL
        )
        "#,
        entry = tables.entry
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{entry}_timestamp ON {entry} (timestamp)",
        entry = tables.entry
    ))
    .execute(pool)
    .await?;

    // No uniqueness on timestamp: admission checks for duplicates itself.
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {cases} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL REFERENCES {entry} (id),
            state_code TEXT NOT NULL,
            confirmed INTEGER,
            active INTEGER,
            deaths INTEGER,
            recovered INTEGER,
            indians INTEGER,
            foreigners INTEGER,
            UNIQUE (entry_id, state_code)
        )
        "#,
        cases = tables.cases,
        entry = tables.entry
    ))
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO sources (name) VALUES (?)")
        .bind(source)
        .execute(pool)
        .await?;

    debug!("Ensured tables {} and {}", tables.entry, tables.cases);
    Ok(tables)
}
