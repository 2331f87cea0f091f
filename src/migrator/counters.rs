//! Process-wide engine counters, guarded by the engine lock.

use serde::Serialize;

/// Aggregate counters for one engine instance.
///
/// `migrations_completed <= migrations_enqueued` holds at every point the
/// lock is released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counters {
    pub total_lbas_tracked: u64,
    /// Every recorded access; doubles as the engine's logical clock
    pub total_operations: u64,
    pub migrations_enqueued: u64,
    pub migrations_completed: u64,
    pub migrations_failed: u64,
    /// Latency observed since the last reward evaluation
    pub latency_accumulator_ns: f64,
    /// Requests observed since the last reward evaluation
    pub requests_accumulator: u64,
}

impl Counters {
    /// Account one request and return its operation number (1-based).
    pub fn record_request(&mut self, latency_ns: f64) -> u64 {
        self.total_operations += 1;
        self.latency_accumulator_ns += latency_ns;
        self.requests_accumulator += 1;
        self.total_operations
    }

    /// Migrations admitted but not yet resolved.
    pub fn migrations_outstanding(&self) -> u64 {
        self.migrations_enqueued
            .saturating_sub(self.migrations_completed + self.migrations_failed)
    }

    /// Start a new reward window.
    pub fn reset_window(&mut self) {
        self.latency_accumulator_ns = 0.0;
        self.requests_accumulator = 0;
    }
}
