//! Snapshot admission from files.

use std::path::Path;

use chrono::{DateTime, Utc};
use covid19_aggregator::{Admission, SourceAggregator};
use covid19_db::models::NewCaseRow;
use covid19_db::SnapshotStore;
use covid19_telemetry::{audit, Metrics};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::snapshot_file::{read_snapshot_csv, scan_snapshot_dir};

/// Admits snapshot files into one source.
pub struct SnapshotProcessor<S> {
    aggregator: SourceAggregator<S>,
    metrics: Metrics,
    sample_output_path: Option<String>,
}

/// Counts from one pass over a snapshot directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub admitted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
struct AuditSnapshot<'a> {
    source: &'a str,
    timestamp: String,
    file: String,
    region_count: usize,
    confirmed_total: i64,
}

impl<S: SnapshotStore> SnapshotProcessor<S> {
    /// Create a new snapshot processor.
    ///
    /// # Arguments
    /// * `aggregator` - Aggregator of the source snapshots are admitted into
    /// * `metrics` - Metrics collector
    /// * `sample_output_path` - Optional path for audit samples
    pub fn new(
        aggregator: SourceAggregator<S>,
        metrics: Metrics,
        sample_output_path: Option<String>,
    ) -> Self {
        Self {
            aggregator,
            metrics,
            sample_output_path,
        }
    }

    pub fn aggregator(&self) -> &SourceAggregator<S> {
        &self.aggregator
    }

    /// Admit the snapshot stored in `path`, taken at `timestamp`.
    pub async fn process_file(
        &self,
        timestamp: DateTime<Utc>,
        path: &Path,
    ) -> anyhow::Result<Admission> {
        let rows = read_snapshot_csv(path)?;
        let admission = self.aggregator.add_new_entry(timestamp, &rows).await?;

        if let Admission::Created { entry_id, rows: count } = admission {
            info!(
                "Admitted {:?} into {} as entry {} with {} regions",
                path,
                self.aggregator.name(),
                entry_id,
                count
            );
            self.write_audit(timestamp, path, &rows);
        }

        Ok(admission)
    }

    /// Admit every snapshot file in `dir`, oldest first.
    ///
    /// A file that fails is logged and counted; the rest are still processed.
    pub async fn process_dir(&self, dir: &Path) -> anyhow::Result<ScanSummary> {
        let mut summary = ScanSummary::default();

        for (timestamp, path) in scan_snapshot_dir(dir)? {
            match self.process_file(timestamp, &path).await {
                Ok(Admission::Created { .. }) => summary.admitted += 1,
                Ok(Admission::Duplicate) => summary.duplicates += 1,
                Err(e) => {
                    error!("Failed to admit snapshot {:?}: {:#}", path, e);
                    self.metrics.inc_snapshot_failures();
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    fn write_audit(&self, timestamp: DateTime<Utc>, path: &Path, rows: &[NewCaseRow]) {
        let Some(ref audit_path) = self.sample_output_path else {
            return;
        };

        let sample = AuditSnapshot {
            source: self.aggregator.name(),
            timestamp: timestamp.to_rfc3339(),
            file: path.display().to_string(),
            region_count: rows.len(),
            confirmed_total: rows.iter().map(|row| row.confirmed.unwrap_or(0)).sum(),
        };

        if let Err(e) = audit::write_audit_sample(Some(audit_path), &sample) {
            warn!("Failed to write audit sample: {}", e);
        }
    }
}
