//! Serialized shapes returned by the aggregator.
//!
//! Field names are part of the contract with dashboard consumers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use covid19_db::models::CaseCounts;
use serde::{Deserialize, Serialize};

/// Region rows of one entry plus national totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasesSnapshot {
    pub source: String,
    /// ISO-8601 timestamp of the entry.
    pub last_updated: String,
    pub states: BTreeMap<String, CaseCounts>,
    pub india: CaseCounts,
}

/// Counts of one day-representative entry, summed across regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCase {
    pub timestamp: String,
    pub date: String,
    pub confirmed: i64,
    pub active: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub indians: i64,
    pub foreigners: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySeries {
    pub source: String,
    /// Newest first.
    pub cases: Vec<DailyCase>,
}

/// One region's counts for one day-representative entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDailyCase {
    pub timestamp: String,
    pub date: String,
    #[serde(flatten)]
    pub counts: CaseCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSeries {
    pub source: String,
    pub states: BTreeMap<String, Vec<StateDailyCase>>,
}

/// Confirmed count of a region on one day of the growth window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCases {
    pub date: NaiveDate,
    pub cases: i64,
}

/// Growth figures of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub state: String,
    pub doubled_in: Option<usize>,
    /// Oldest day first.
    pub cases: Vec<DayCases>,
    pub current: i64,
}
