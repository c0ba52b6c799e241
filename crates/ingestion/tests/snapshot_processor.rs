//! Directory ingestion into an in-memory database.

use std::path::Path;

use chrono::{TimeZone, Utc};
use covid19_aggregator::{Admission, SourceAggregator};
use covid19_db::{DbPool, SnapshotStore, SqliteSnapshotStore};
use covid19_ingestion::{snapshot_file_name, ScanSummary, SnapshotProcessor};
use covid19_telemetry::Metrics;

const HEADER: &str = "state_code,confirmed,active,deaths,recovered,indians,foreigners\n";

async fn processor(audit: Option<String>) -> (SnapshotProcessor<SqliteSnapshotStore>, Metrics) {
    let db = DbPool::new(":memory:").await.unwrap();
    db.migrate().await.unwrap();
    let store = SqliteSnapshotStore::open(db, "mohfw").await.unwrap();
    let metrics = Metrics::new().unwrap();
    let aggregator = SourceAggregator::new(store, metrics.clone());
    (SnapshotProcessor::new(aggregator, metrics.clone(), audit), metrics)
}

fn write_snapshot(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), format!("{HEADER}{body}")).unwrap();
}

#[tokio::test]
async fn test_rescanning_a_directory_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let first = Utc.with_ymd_and_hms(2020, 3, 20, 10, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2020, 3, 21, 10, 0, 0).unwrap();
    write_snapshot(dir.path(), &snapshot_file_name(first), "KL,28,25,,3,26,2\nDL,17,,1,,,\n");
    write_snapshot(dir.path(), &snapshot_file_name(second), "KL,40,36,1,3,38,2\n");

    let (processor, metrics) = processor(None).await;

    let summary = processor.process_dir(dir.path()).await.unwrap();
    assert_eq!(summary, ScanSummary { admitted: 2, duplicates: 0, failed: 0 });

    let summary = processor.process_dir(dir.path()).await.unwrap();
    assert_eq!(summary, ScanSummary { admitted: 0, duplicates: 2, failed: 0 });

    assert_eq!(processor.aggregator().store().entry_count().await.unwrap(), 2);
    assert_eq!(metrics.entries_admitted(), 2);
    assert_eq!(metrics.entries_skipped(), 2);

    let snapshot = processor.aggregator().get_cases(None).await.unwrap();
    assert_eq!(snapshot.india.confirmed, Some(40));
}

#[tokio::test]
async fn test_bad_file_does_not_stop_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let good = Utc.with_ymd_and_hms(2020, 3, 20, 10, 0, 0).unwrap();
    let bad = Utc.with_ymd_and_hms(2020, 3, 21, 10, 0, 0).unwrap();
    write_snapshot(dir.path(), &snapshot_file_name(good), "KL,28,,,,,\n");
    write_snapshot(dir.path(), &snapshot_file_name(bad), "KL,lots,,,,,\n");

    let (processor, _) = processor(None).await;
    let summary = processor.process_dir(dir.path()).await.unwrap();

    assert_eq!(summary, ScanSummary { admitted: 1, duplicates: 0, failed: 1 });
    let entry = processor.aggregator().get_entry(None).await.unwrap();
    assert_eq!(entry.timestamp, good);
}

#[tokio::test]
async fn test_admitted_snapshots_are_audited() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let ts = Utc.with_ymd_and_hms(2020, 3, 20, 10, 0, 0).unwrap();
    let file = dir.path().join(snapshot_file_name(ts));
    write_snapshot(dir.path(), &snapshot_file_name(ts), "KL,28,,,,,\nDL,17,,,,,\n");

    let (processor, _) = processor(Some(audit_path.display().to_string())).await;
    let admission = processor.process_file(ts, &file).await.unwrap();
    assert!(matches!(admission, Admission::Created { rows: 2, .. }));
    assert_eq!(processor.process_file(ts, &file).await.unwrap(), Admission::Duplicate);

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert_eq!(audit.matches("\"confirmed_total\": 45").count(), 1);
}
