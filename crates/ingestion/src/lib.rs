//! Snapshot file ingestion for covid19 sources.

pub mod snapshot_file;
pub mod snapshot_processor;

pub use snapshot_file::{parse_snapshot_csv, read_snapshot_csv, scan_snapshot_dir, snapshot_file_name};
pub use snapshot_processor::{ScanSummary, SnapshotProcessor};
