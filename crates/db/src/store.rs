//! Snapshot storage for a single source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::error::StoreResult;
use crate::migrations::{ensure_source_tables, SourceTables};
use crate::models::{CaseRow, ConfirmedRow, DailyTotalsRow, Entry, NewCaseRow, StateDailyRow};
use crate::pool::DbPool;

/// Rows per multi-row INSERT, well under SQLite's bind parameter limit.
const INSERT_BATCH_ROWS: usize = 500;

/// Storage operations the aggregator needs from one source's tables.
///
/// Implementations map columns to the typed records in [`crate::models`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Name of the source these tables belong to.
    fn source(&self) -> &str;

    /// Whether an entry with exactly this timestamp exists.
    async fn has_entry(&self, timestamp: DateTime<Utc>) -> StoreResult<bool>;

    /// Insert an entry and all of its region rows as one atomic unit.
    ///
    /// # Returns
    /// The generated entry id. On error nothing has been written.
    async fn insert_entry(&self, timestamp: DateTime<Utc>, rows: &[NewCaseRow]) -> StoreResult<i64>;

    /// The latest entry with a timestamp strictly before `before`, or the
    /// latest entry overall when `before` is `None`.
    async fn latest_entry(&self, before: Option<DateTime<Utc>>) -> StoreResult<Option<Entry>>;

    /// All region rows of one entry, ordered by region code.
    async fn case_rows(&self, entry_id: i64) -> StoreResult<Vec<CaseRow>>;

    /// The latest entry of every UTC calendar day, newest day first.
    async fn daily_entries(&self) -> StoreResult<Vec<Entry>>;

    /// Counts summed across regions (or for one region) per entry, newest
    /// first. Missing counts add as zero.
    async fn daily_totals(
        &self,
        entry_ids: &[i64],
        state: Option<&str>,
    ) -> StoreResult<Vec<DailyTotalsRow>>;

    /// Raw region rows of the given entries, ordered by region code and
    /// then newest first.
    async fn daily_state_rows(&self, entry_ids: &[i64]) -> StoreResult<Vec<StateDailyRow>>;

    /// Confirmed count per (day, region) of the given entries, ordered by
    /// region code and then newest day first.
    async fn confirmed_by_day(&self, entry_ids: &[i64]) -> StoreResult<Vec<ConfirmedRow>>;

    /// Number of stored entries.
    async fn entry_count(&self) -> StoreResult<i64>;
}

/// SQLite-backed [`SnapshotStore`].
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    db: DbPool,
    source: String,
    tables: SourceTables,
}

impl SqliteSnapshotStore {
    /// Open the store of a source, creating its tables if needed.
    ///
    /// The registry migration must have been run on `db` first.
    pub async fn open(db: DbPool, source: &str) -> StoreResult<Self> {
        let tables = ensure_source_tables(db.pool(), source).await?;
        Ok(Self {
            db,
            source: source.to_string(),
            tables,
        })
    }

    pub fn tables(&self) -> &SourceTables {
        &self.tables
    }
}

/// Append `(id, id, ...)` with bound ids.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, entry_ids: &[i64]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in entry_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    fn source(&self) -> &str {
        &self.source
    }

    async fn has_entry(&self, timestamp: DateTime<Utc>) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE timestamp = ?)",
            self.tables.entry
        ))
        .bind(timestamp)
        .fetch_one(self.db.pool())
        .await?;
        Ok(exists)
    }

    async fn insert_entry(&self, timestamp: DateTime<Utc>, rows: &[NewCaseRow]) -> StoreResult<i64> {
        // Dropping the transaction without commit rolls it back.
        let mut tx = self.db.pool().begin().await?;

        let entry_id: i64 = sqlx::query_scalar(&format!(
            "INSERT INTO {} (timestamp) VALUES (?) RETURNING id",
            self.tables.entry
        ))
        .bind(timestamp)
        .fetch_one(&mut *tx)
        .await?;

        for chunk in rows.chunks(INSERT_BATCH_ROWS) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} (entry_id, state_code, confirmed, active, deaths, recovered, indians, foreigners) ",
                self.tables.cases
            ));
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(entry_id)
                    .push_bind(row.state_code.clone())
                    .push_bind(row.confirmed)
                    .push_bind(row.active)
                    .push_bind(row.deaths)
                    .push_bind(row.recovered)
                    .push_bind(row.indians)
                    .push_bind(row.foreigners);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!("Inserted entry {} with {} rows into {}", entry_id, rows.len(), self.tables.entry);
        Ok(entry_id)
    }

    async fn latest_entry(&self, before: Option<DateTime<Utc>>) -> StoreResult<Option<Entry>> {
        let entry = match before {
            Some(bound) => {
                sqlx::query_as::<_, Entry>(&format!(
                    "SELECT id, timestamp FROM {} WHERE julianday(timestamp) < julianday(?) ORDER BY julianday(timestamp) DESC LIMIT 1",
                    self.tables.entry
                ))
                .bind(bound)
                .fetch_optional(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Entry>(&format!(
                    "SELECT id, timestamp FROM {} ORDER BY julianday(timestamp) DESC LIMIT 1",
                    self.tables.entry
                ))
                .fetch_optional(self.db.pool())
                .await?
            }
        };
        Ok(entry)
    }

    async fn case_rows(&self, entry_id: i64) -> StoreResult<Vec<CaseRow>> {
        let rows = sqlx::query_as::<_, CaseRow>(&format!(
            r#"
            SELECT entry_id, state_code, confirmed, active, deaths, recovered, indians, foreigners
            FROM {}
            WHERE entry_id = ?
            ORDER BY state_code
            "#,
            self.tables.cases
        ))
        .bind(entry_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    async fn daily_entries(&self) -> StoreResult<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(&format!(
            r#"
            SELECT id, timestamp FROM (
                SELECT id, timestamp,
                    ROW_NUMBER() OVER (
                        PARTITION BY date(timestamp)
                        ORDER BY julianday(timestamp) DESC
                    ) AS day_rank
                FROM {}
            )
            WHERE day_rank = 1
            ORDER BY julianday(timestamp) DESC
            "#,
            self.tables.entry
        ))
        .fetch_all(self.db.pool())
        .await?;
        debug!("{} daily entries in {}", entries.len(), self.tables.entry);
        Ok(entries)
    }

    async fn daily_totals(
        &self,
        entry_ids: &[i64],
        state: Option<&str>,
    ) -> StoreResult<Vec<DailyTotalsRow>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            r#"
            SELECT e.timestamp AS timestamp,
                COALESCE(SUM(c.confirmed), 0) AS confirmed,
                COALESCE(SUM(c.active), 0) AS active,
                COALESCE(SUM(c.deaths), 0) AS deaths,
                COALESCE(SUM(c.recovered), 0) AS recovered,
                COALESCE(SUM(c.indians), 0) AS indians,
                COALESCE(SUM(c.foreigners), 0) AS foreigners
            FROM {cases} c
            JOIN {entry} e ON e.id = c.entry_id
            WHERE c.entry_id IN "#,
            cases = self.tables.cases,
            entry = self.tables.entry
        ));
        push_id_list(&mut builder, entry_ids);
        if let Some(state) = state {
            builder.push(" AND c.state_code = ").push_bind(state.to_string());
        }
        builder.push(" GROUP BY e.timestamp ORDER BY julianday(e.timestamp) DESC");

        let rows = builder
            .build_query_as::<DailyTotalsRow>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    async fn daily_state_rows(&self, entry_ids: &[i64]) -> StoreResult<Vec<StateDailyRow>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            r#"
            SELECT c.state_code AS state_code, e.timestamp AS timestamp,
                c.confirmed AS confirmed, c.active AS active, c.deaths AS deaths,
                c.recovered AS recovered, c.indians AS indians, c.foreigners AS foreigners
            FROM {cases} c
            JOIN {entry} e ON e.id = c.entry_id
            WHERE c.entry_id IN "#,
            cases = self.tables.cases,
            entry = self.tables.entry
        ));
        push_id_list(&mut builder, entry_ids);
        builder.push(" ORDER BY c.state_code, julianday(e.timestamp) DESC");

        let rows = builder
            .build_query_as::<StateDailyRow>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    async fn confirmed_by_day(&self, entry_ids: &[i64]) -> StoreResult<Vec<ConfirmedRow>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            r#"
            SELECT date(e.timestamp) AS date, c.state_code AS state, c.confirmed AS confirmed
            FROM {cases} c
            JOIN {entry} e ON e.id = c.entry_id
            WHERE c.entry_id IN "#,
            cases = self.tables.cases,
            entry = self.tables.entry
        ));
        push_id_list(&mut builder, entry_ids);
        builder.push(" ORDER BY c.state_code, date(e.timestamp) DESC");

        let rows = builder
            .build_query_as::<ConfirmedRow>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    async fn entry_count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.tables.entry))
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}

/// Names of every registered source, alphabetically.
pub async fn list_sources(db: &DbPool) -> StoreResult<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM sources ORDER BY name")
        .fetch_all(db.pool())
        .await?;
    Ok(names)
}
