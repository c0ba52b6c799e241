//! Snapshot files on disk.
//!
//! A snapshot is a CSV file with the header
//! `state_code,confirmed,active,deaths,recovered,indians,foreigners`.
//! Empty count cells are read as missing values. Inside a snapshot
//! directory each file is named after its timestamp, `20200320T100000Z.csv`.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use covid19_db::models::NewCaseRow;
use tracing::{debug, warn};

const FILE_STEM_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// File name a snapshot taken at `timestamp` is stored under.
pub fn snapshot_file_name(timestamp: DateTime<Utc>) -> String {
    format!("{}.csv", timestamp.format(FILE_STEM_FORMAT))
}

/// Timestamp encoded in a snapshot file name, if it is one.
pub fn parse_snapshot_file_name(path: &Path) -> Option<DateTime<Utc>> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let naive = NaiveDateTime::parse_from_str(stem, FILE_STEM_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Parse snapshot rows from CSV text.
pub fn parse_snapshot_csv<R: Read>(reader: R) -> anyhow::Result<Vec<NewCaseRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        let row: NewCaseRow = result.with_context(|| format!("Invalid snapshot row {}", index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read snapshot rows from a CSV file.
pub fn read_snapshot_csv(path: &Path) -> anyhow::Result<Vec<NewCaseRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open snapshot file: {path:?}"))?;
    parse_snapshot_csv(file).with_context(|| format!("Failed to read snapshot file: {path:?}"))
}

/// Snapshot files of a directory with their timestamps, oldest first.
///
/// Files whose names are not snapshot names are skipped.
pub fn scan_snapshot_dir(dir: &Path) -> anyhow::Result<Vec<(DateTime<Utc>, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read snapshot directory: {dir:?}"))?;

    let mut snapshots = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match parse_snapshot_file_name(&path) {
            Some(timestamp) => snapshots.push((timestamp, path)),
            None => warn!("Skipping {:?}: not named like a snapshot", path),
        }
    }

    snapshots.sort();
    debug!("Found {} snapshot files in {:?}", snapshots.len(), dir);
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_round_trip() {
        let ts = Utc.with_ymd_and_hms(2020, 3, 20, 10, 5, 9).unwrap();
        let name = snapshot_file_name(ts);
        assert_eq!(name, "20200320T100509Z.csv");
        assert_eq!(parse_snapshot_file_name(Path::new(&name)), Some(ts));
    }

    #[test]
    fn test_rejects_other_file_names() {
        assert_eq!(parse_snapshot_file_name(Path::new("notes.csv")), None);
        assert_eq!(parse_snapshot_file_name(Path::new("20200320T100509Z.json")), None);
        assert_eq!(parse_snapshot_file_name(Path::new("20200320T100509Z")), None);
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let csv = "state_code,confirmed,active,deaths,recovered,indians,foreigners\n\
                   KL, 28 ,25,,3,26,2\n\
                   DL,17,,1,,,\n";
        let rows = parse_snapshot_csv(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state_code, "KL");
        assert_eq!(rows[0].confirmed, Some(28));
        assert_eq!(rows[0].deaths, None);
        assert_eq!(rows[1].active, None);
        assert_eq!(rows[1].deaths, Some(1));
    }

    #[test]
    fn test_bad_count_is_an_error() {
        let csv = "state_code,confirmed,active,deaths,recovered,indians,foreigners\n\
                   KL,many,,,,,\n";
        assert!(parse_snapshot_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_scan_orders_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["20200321T080000Z.csv", "20200320T100000Z.csv", "README.md"] {
            std::fs::write(dir.path().join(name), "state_code\n").unwrap();
        }

        let found = scan_snapshot_dir(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["20200320T100000Z.csv", "20200321T080000Z.csv"]);
    }
}
