//! Prometheus metrics for covid19 snapshot ingestion and queries.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};

/// Metrics collector for the covid19 service.
///
/// Each instance owns its registry, so several collectors can live in one
/// process without colliding.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    entries_admitted: IntCounter,
    entries_skipped: IntCounter,
    case_rows_ingested: IntCounter,
    snapshot_failures: IntCounter,
    query_latency: HistogramVec,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let entries_admitted = IntCounter::with_opts(Opts::new(
            "covid19_entries_admitted_total",
            "Total number of snapshot entries admitted",
        ))?;
        registry.register(Box::new(entries_admitted.clone()))?;

        let entries_skipped = IntCounter::with_opts(Opts::new(
            "covid19_entries_skipped_total",
            "Total number of snapshots skipped because their timestamp was already stored",
        ))?;
        registry.register(Box::new(entries_skipped.clone()))?;

        let case_rows_ingested = IntCounter::with_opts(Opts::new(
            "covid19_case_rows_ingested_total",
            "Total number of region rows stored",
        ))?;
        registry.register(Box::new(case_rows_ingested.clone()))?;

        let snapshot_failures = IntCounter::with_opts(Opts::new(
            "covid19_snapshot_failures_total",
            "Total number of snapshot files that could not be admitted",
        ))?;
        registry.register(Box::new(snapshot_failures.clone()))?;

        let query_latency = HistogramVec::new(
            HistogramOpts::new(
                "covid19_query_latency_seconds",
                "Aggregator operation latency in seconds",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(query_latency.clone()))?;

        Ok(Self {
            registry,
            entries_admitted,
            entries_skipped,
            case_rows_ingested,
            snapshot_failures,
            query_latency,
        })
    }

    /// Record an admitted entry and the number of rows stored with it.
    pub fn inc_entries_admitted(&self, rows: u64) {
        self.entries_admitted.inc();
        self.case_rows_ingested.inc_by(rows);
    }

    pub fn inc_entries_skipped(&self) {
        self.entries_skipped.inc();
    }

    pub fn inc_snapshot_failures(&self) {
        self.snapshot_failures.inc();
    }

    /// Record operation latency.
    pub fn observe_query_latency(&self, operation: &str, duration_secs: f64) {
        self.query_latency
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Get Prometheus metrics as a string.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn entries_admitted(&self) -> u64 {
        self.entries_admitted.get()
    }

    pub fn entries_skipped(&self) -> u64 {
        self.entries_skipped.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();

        first.inc_entries_admitted(36);
        first.inc_entries_skipped();

        assert_eq!(first.entries_admitted(), 1);
        assert_eq!(second.entries_admitted(), 0);
    }

    #[test]
    fn test_gather_renders_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_entries_admitted(2);
        metrics.observe_query_latency("get_cases", 0.01);

        let text = metrics.gather().unwrap();
        assert!(text.contains("covid19_entries_admitted_total 1"));
        assert!(text.contains("covid19_case_rows_ingested_total 2"));
        assert!(text.contains("operation=\"get_cases\""));
    }
}
