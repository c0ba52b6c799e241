//! Observability for covid19 snapshot ingestion and queries.

pub mod audit;
pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::Metrics;
