//! Per-source aggregation of case snapshots.
//!
//! Turns the entries and region rows of a source into latest totals, daily
//! series and growth figures.

pub mod aggregator;
pub mod error;
pub mod growth;
pub mod payloads;
pub mod totals;

pub use aggregator::{group_by_state, Admission, SourceAggregator};
pub use error::{AggregateError, Result};
pub use payloads::{CasesSnapshot, DailyCase, DailySeries, DayCases, GrowthRecord, StateSeries};

/// Key of the synthetic national region in every payload.
pub const NATIONAL_REGION: &str = "india";
