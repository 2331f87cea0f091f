//! Metrics module
//!
//! Prometheus exposition of engine counters.

mod exporter;

pub use exporter::{EngineMetrics, OUTCOME_COMPLETED, OUTCOME_FAILED};
