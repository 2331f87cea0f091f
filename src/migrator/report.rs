//! Final statistics snapshot.
//!
//! Field names and order are relied on by tooling that parses the
//! end-of-run summary. Append new fields at the end only.

use serde::Serialize;

/// End-of-run (or on-demand) statistics for the migration engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationStatistics {
    pub total_lbas_tracked: u64,
    pub hot_lbas: u64,
    pub cold_lbas: u64,
    /// Sum of per-LBA access counts since each LBA's last reset
    pub total_lba_operations: u64,
    /// Every request observed over the run
    pub total_requests: u64,
    pub lbas_migrated: u64,
    pub total_migrations_across_lbas: u64,
    pub migrations_enqueued: u64,
    pub migrations_completed: u64,
    pub migrations_failed: u64,
    pub last_reward: f64,
    pub avg_reward: f64,
    /// Migrations still queued, neither completed nor failed
    pub migration_queue_size: u64,
    pub migration_queue_full: bool,
}

impl MigrationStatistics {
    /// Report labels paired with rendered values, in report order.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total LBAs tracked", self.total_lbas_tracked.to_string()),
            ("Hot LBAs (access >= 5)", self.hot_lbas.to_string()),
            ("Cold LBAs (access <= 1)", self.cold_lbas.to_string()),
            ("Total LBA operations", self.total_lba_operations.to_string()),
            ("Total I/O requests", self.total_requests.to_string()),
            ("LBAs migrated", self.lbas_migrated.to_string()),
            (
                "Total migrations across LBAs",
                self.total_migrations_across_lbas.to_string(),
            ),
            ("Migrations enqueued", self.migrations_enqueued.to_string()),
            ("Migrations completed", self.migrations_completed.to_string()),
            ("Migrations failed", self.migrations_failed.to_string()),
            ("Last reward", format!("{:.6e}", self.last_reward)),
            ("Avg reward", format!("{:.6e}", self.avg_reward)),
            ("Migration Queue Size", self.migration_queue_size.to_string()),
            ("Migration Queue Full", self.migration_queue_full.to_string()),
        ]
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for MigrationStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Final Statistics (LBA-level):")?;
        for (label, value) in self.lines() {
            writeln!(f, "  {}: {}", label, value)?;
        }
        Ok(())
    }
}
