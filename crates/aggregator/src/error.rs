//! Errors raised by aggregator operations.

use chrono::NaiveDate;
use covid19_db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No entry found for source {source_name}{}", .before.map(|d| format!(" on or before {d}")).unwrap_or_default())]
    NoEntry {
        source_name: String,
        before: Option<NaiveDate>,
    },
    #[error("Entry {entry_id} has no case rows")]
    EmptyCases { entry_id: i64 },
    #[error("Source {source_name} has no daily case data")]
    EmptySeries { source_name: String },
}

pub type Result<T> = std::result::Result<T, AggregateError>;
