//! Audit logging for admitted snapshots.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Append a pretty-printed JSON payload to the audit file.
///
/// Does nothing when `path` is `None`.
pub fn write_audit_sample<P: AsRef<Path>, T: Serialize>(
    path: Option<P>,
    payload: &T,
) -> anyhow::Result<()> {
    if let Some(audit_path) = path {
        let json = serde_json::to_string_pretty(payload)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&audit_path)?;
        writeln!(file, "{}", json)?;
        info!("Wrote audit sample to {:?}", audit_path.as_ref());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        source: &'static str,
        rows: usize,
    }

    #[test]
    fn test_appends_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        write_audit_sample(Some(&path), &Sample { source: "mohfw", rows: 3 }).unwrap();
        write_audit_sample(Some(&path), &Sample { source: "mohfw", rows: 4 }).unwrap();
        write_audit_sample(None::<&Path>, &Sample { source: "x", rows: 0 }).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("\"source\": \"mohfw\"").count(), 2);
        assert!(!text.contains("\"x\""));
    }
}
