// Rust guideline compliant 2026-10-18

//! Adapters (secondary ports) for the showdown binary.
//!
//! Each sub-module implements one hexagonal port trait defined in the
//! `domain` crate. The SQLite adapters share one connection pool, so both
//! query engines see what both sinks wrote.

pub mod log_progress;
pub mod sqlite_engine;
pub mod sqlite_log_sink;
pub mod sqlite_time_series;
