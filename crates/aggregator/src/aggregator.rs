//! The per-source aggregator.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use covid19_db::models::{Entry, NewCaseRow, StateDailyRow};
use covid19_db::SnapshotStore;
use covid19_telemetry::Metrics;
use tracing::{debug, info};

use crate::error::{AggregateError, Result};
use crate::growth::compute_growth;
use crate::payloads::{CasesSnapshot, DailyCase, DailySeries, GrowthRecord, StateDailyCase, StateSeries};
use crate::totals::compute_totals;

/// Outcome of [`SourceAggregator::add_new_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new entry was stored together with `rows` region rows.
    Created { entry_id: i64, rows: usize },
    /// An entry with the same timestamp already existed; nothing was written.
    Duplicate,
}

/// Reads and writes the snapshots of one source.
pub struct SourceAggregator<S> {
    store: S,
    metrics: Metrics,
}

impl<S: SnapshotStore> SourceAggregator<S> {
    /// Create an aggregator over a source's store.
    pub fn new(store: S, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Name of the source.
    pub fn name(&self) -> &str {
        self.store.source()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn observe(&self, operation: &str, started: Instant) {
        self.metrics
            .observe_query_latency(operation, started.elapsed().as_secs_f64());
    }

    /// Store a snapshot unless one with the same timestamp already exists.
    ///
    /// The entry and its rows are written atomically. The existence check
    /// and the insert are separate statements, so two concurrent admissions
    /// of the same timestamp can both succeed.
    pub async fn add_new_entry(
        &self,
        timestamp: DateTime<Utc>,
        rows: &[NewCaseRow],
    ) -> Result<Admission> {
        let started = Instant::now();

        if self.store.has_entry(timestamp).await? {
            info!(
                "Entry already exists for {} at {}, ignoring",
                self.name(),
                timestamp.to_rfc3339()
            );
            self.metrics.inc_entries_skipped();
            return Ok(Admission::Duplicate);
        }

        info!("Adding entry for {} at {}", self.name(), timestamp.to_rfc3339());
        let entry_id = self.store.insert_entry(timestamp, rows).await?;
        self.metrics.inc_entries_admitted(rows.len() as u64);
        self.observe("add_new_entry", started);

        Ok(Admission::Created {
            entry_id,
            rows: rows.len(),
        })
    }

    /// The latest entry on or before `date`, or the latest entry overall.
    ///
    /// Every timestamp on `date` itself qualifies.
    pub async fn get_entry(&self, date: Option<NaiveDate>) -> Result<Entry> {
        let before = date.map(start_of_next_day);
        self.store
            .latest_entry(before)
            .await?
            .ok_or_else(|| AggregateError::NoEntry {
                source_name: self.name().to_string(),
                before: date,
            })
    }

    /// Region rows and national totals of the entry picked by [`Self::get_entry`].
    pub async fn get_cases(&self, date: Option<NaiveDate>) -> Result<CasesSnapshot> {
        let started = Instant::now();
        let entry = self.get_entry(date).await?;

        let states: BTreeMap<String, _> = self
            .store
            .case_rows(entry.id)
            .await?
            .into_iter()
            .map(|row| {
                let counts = row.counts();
                (row.state_code, counts)
            })
            .collect();

        let india = compute_totals(states.values())
            .ok_or(AggregateError::EmptyCases { entry_id: entry.id })?;
        self.observe("get_cases", started);

        Ok(CasesSnapshot {
            source: self.name().to_string(),
            last_updated: entry.timestamp.to_rfc3339(),
            states,
            india,
        })
    }

    /// The latest entry of every calendar day, newest day first.
    pub async fn get_daily_entries(&self) -> Result<Vec<Entry>> {
        Ok(self.store.daily_entries().await?)
    }

    /// One row per day summing every count across regions, or the counts of
    /// a single region when `state` is given. Newest first.
    pub async fn get_daily_cases(&self, state: Option<&str>) -> Result<DailySeries> {
        let started = Instant::now();
        let entry_ids = entry_ids(&self.get_daily_entries().await?);

        let cases = self
            .store
            .daily_totals(&entry_ids, state)
            .await?
            .into_iter()
            .map(|row| DailyCase {
                date: row.timestamp.date_naive().to_string(),
                timestamp: row.timestamp.to_rfc3339(),
                confirmed: row.confirmed,
                active: row.active,
                deaths: row.deaths,
                recovered: row.recovered,
                indians: row.indians,
                foreigners: row.foreigners,
            })
            .collect::<Vec<_>>();
        debug!("{} daily rows for {}", cases.len(), self.name());
        self.observe("get_daily_cases", started);

        Ok(DailySeries {
            source: self.name().to_string(),
            cases,
        })
    }

    /// Daily series of every region, each newest first.
    pub async fn get_daily_cases_by_state(&self) -> Result<StateSeries> {
        let started = Instant::now();
        let entry_ids = entry_ids(&self.get_daily_entries().await?);

        // Rows come back ordered by region code, as group_by_state requires.
        let rows = self.store.daily_state_rows(&entry_ids).await?;
        let states = group_by_state(rows);
        self.observe("get_daily_cases_by_state", started);

        Ok(StateSeries {
            source: self.name().to_string(),
            states,
        })
    }

    /// Confirmed counts over the growth window and doubling time of every
    /// region plus the national aggregate.
    pub async fn get_cases_growth(&self) -> Result<Vec<GrowthRecord>> {
        let started = Instant::now();
        let entry_ids = entry_ids(&self.get_daily_entries().await?);

        let rows = self.store.confirmed_by_day(&entry_ids).await?;
        let records = compute_growth(&rows).ok_or_else(|| AggregateError::EmptySeries {
            source_name: self.name().to_string(),
        })?;
        self.observe("get_cases_growth", started);

        Ok(records)
    }
}

fn entry_ids(entries: &[Entry]) -> Vec<i64> {
    entries.iter().map(|entry| entry.id).collect()
}

/// Midnight UTC at the start of the day after `date`.
fn start_of_next_day(date: NaiveDate) -> DateTime<Utc> {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN))
}

/// Split rows into one series per region.
///
/// Rows must already be contiguous by region code: each run of equal codes
/// becomes one series. A region whose rows are split into several runs
/// keeps only its last run.
pub fn group_by_state(rows: Vec<StateDailyRow>) -> BTreeMap<String, Vec<StateDailyCase>> {
    let mut groups = BTreeMap::new();
    let mut current: Option<(String, Vec<StateDailyCase>)> = None;

    for row in rows {
        let case = StateDailyCase {
            timestamp: row.timestamp.to_rfc3339(),
            date: row.timestamp.date_naive().to_string(),
            counts: row.counts(),
        };
        match current.as_mut() {
            Some((state, cases)) if *state == row.state_code => cases.push(case),
            _ => {
                if let Some((state, cases)) = current.replace((row.state_code, vec![case])) {
                    groups.insert(state, cases);
                }
            }
        }
    }
    if let Some((state, cases)) = current {
        groups.insert(state, cases);
    }

    groups
}
