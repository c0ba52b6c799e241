//! Database layer for covid19 snapshot storage.
//!
//! Provides SQLite storage for per-source snapshot entries and the
//! per-region case rows that belong to them.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use pool::DbPool;
pub use store::{list_sources, SnapshotStore, SqliteSnapshotStore};
