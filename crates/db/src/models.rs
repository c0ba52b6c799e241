//! Database models and types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One ingested snapshot event for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Entry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Per-region counts as published by a source.
///
/// Every field is nullable; sources routinely leave columns blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCounts {
    pub confirmed: Option<i64>,
    pub active: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
    pub indians: Option<i64>,
    pub foreigners: Option<i64>,
}

impl CaseCounts {
    /// Field-wise sum where a missing value counts as zero.
    ///
    /// The result always has every field set.
    pub fn add(&self, other: &CaseCounts) -> CaseCounts {
        fn sum(a: Option<i64>, b: Option<i64>) -> Option<i64> {
            Some(a.unwrap_or(0) + b.unwrap_or(0))
        }
        CaseCounts {
            confirmed: sum(self.confirmed, other.confirmed),
            active: sum(self.active, other.active),
            deaths: sum(self.deaths, other.deaths),
            recovered: sum(self.recovered, other.recovered),
            indians: sum(self.indians, other.indians),
            foreigners: sum(self.foreigners, other.foreigners),
        }
    }
}

/// A region row within a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CaseRow {
    pub entry_id: i64,
    pub state_code: String,
    pub confirmed: Option<i64>,
    pub active: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
    pub indians: Option<i64>,
    pub foreigners: Option<i64>,
}

impl CaseRow {
    pub fn counts(&self) -> CaseCounts {
        CaseCounts {
            confirmed: self.confirmed,
            active: self.active,
            deaths: self.deaths,
            recovered: self.recovered,
            indians: self.indians,
            foreigners: self.foreigners,
        }
    }
}

/// A region row waiting to be admitted; it has no entry yet.
///
/// Field names match the snapshot CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCaseRow {
    pub state_code: String,
    pub confirmed: Option<i64>,
    pub active: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
    pub indians: Option<i64>,
    pub foreigners: Option<i64>,
}

impl NewCaseRow {
    pub fn new(state_code: impl Into<String>, counts: CaseCounts) -> Self {
        Self {
            state_code: state_code.into(),
            confirmed: counts.confirmed,
            active: counts.active,
            deaths: counts.deaths,
            recovered: counts.recovered,
            indians: counts.indians,
            foreigners: counts.foreigners,
        }
    }
}

/// Counts summed across regions for one day-representative entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DailyTotalsRow {
    pub timestamp: DateTime<Utc>,
    pub confirmed: i64,
    pub active: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub indians: i64,
    pub foreigners: i64,
}

/// One region's raw counts for one day-representative entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StateDailyRow {
    pub state_code: String,
    pub timestamp: DateTime<Utc>,
    pub confirmed: Option<i64>,
    pub active: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
    pub indians: Option<i64>,
    pub foreigners: Option<i64>,
}

impl StateDailyRow {
    pub fn counts(&self) -> CaseCounts {
        CaseCounts {
            confirmed: self.confirmed,
            active: self.active,
            deaths: self.deaths,
            recovered: self.recovered,
            indians: self.indians,
            foreigners: self.foreigners,
        }
    }
}

/// Confirmed count of one region on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ConfirmedRow {
    pub date: NaiveDate,
    pub state: String,
    pub confirmed: Option<i64>,
}
