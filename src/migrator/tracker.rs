//! Access Tracker
//!
//! Per-LBA access counters and hotness classification. The registry is
//! monotonic: an LBA is registered on its first observed access and is never
//! removed during a run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::ports::{LbaId, Tier, TierClassification};
use crate::error::{Error, Result};

/// Access count at or above which an LBA is hot.
pub const HOT_THRESHOLD: u64 = 5;

/// Access count at or below which an LBA is cold.
pub const COLD_THRESHOLD: u64 = 1;

/// Classify an access count.
pub fn classify(access_count: u64) -> TierClassification {
    if access_count >= HOT_THRESHOLD {
        TierClassification::Hot
    } else if access_count <= COLD_THRESHOLD {
        TierClassification::Cold
    } else {
        TierClassification::Neutral
    }
}

/// Tracked state of one logical block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LbaState {
    pub id: LbaId,
    /// Accesses since registration or the last completed migration
    pub access_count: u64,
    pub current_tier: Tier,
    /// Completed migrations over the whole run
    pub migration_count: u64,
    /// Last reported request size, as given by the caller
    pub size_bytes: i64,
    pub reads: u64,
    pub writes: u64,
    pub total_latency_ns: f64,
    pub first_seen_op: u64,
    pub last_access_op: u64,
    pub last_hot_op: Option<u64>,
    pub last_migrated_op: Option<u64>,
}

impl LbaState {
    fn new(id: LbaId, tier: Tier, op: u64) -> Self {
        Self {
            id,
            access_count: 0,
            current_tier: tier,
            migration_count: 0,
            size_bytes: 0,
            reads: 0,
            writes: 0,
            total_latency_ns: 0.0,
            first_seen_op: op,
            last_access_op: op,
            last_hot_op: None,
            last_migrated_op: None,
        }
    }

    pub fn classification(&self) -> TierClassification {
        classify(self.access_count)
    }

    pub fn is_hot(&self) -> bool {
        self.classification() == TierClassification::Hot
    }

    pub fn is_cold(&self) -> bool {
        self.classification() == TierClassification::Cold
    }

    /// Operations since the block was last touched, by access or migration.
    pub fn idle_ops(&self, now: u64) -> u64 {
        let last = self
            .last_migrated_op
            .map_or(self.last_access_op, |m| m.max(self.last_access_op));
        now.saturating_sub(last)
    }

    /// Operations since the block was last hot (or first seen, if never hot).
    pub fn ops_since_hot(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_hot_op.unwrap_or(self.first_seen_op))
    }

    /// Size used for capacity accounting. Negative sizes count as zero.
    pub fn footprint(&self) -> u64 {
        self.size_bytes.max(0) as u64
    }

    pub fn average_latency_ns(&self) -> f64 {
        let accesses = self.reads + self.writes;
        if accesses == 0 {
            0.0
        } else {
            self.total_latency_ns / accesses as f64
        }
    }
}

/// One observed I/O request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessRecord {
    pub lba: LbaId,
    pub tier: Tier,
    pub latency_ns: f64,
    pub size_bytes: i64,
    pub is_read: bool,
}

/// Registry of every LBA seen during the run.
#[derive(Debug, Default)]
pub struct AccessTracker {
    lbas: BTreeMap<LbaId, LbaState>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one access at operation `op`.
    ///
    /// The caller-reported tier is authoritative and overwrites the tracked
    /// one. Returns `true` when the LBA was seen for the first time.
    pub fn record_access(&mut self, op: u64, record: &AccessRecord) -> bool {
        let mut registered = false;
        let state = self.lbas.entry(record.lba).or_insert_with(|| {
            registered = true;
            LbaState::new(record.lba, record.tier, op)
        });

        state.access_count += 1;
        state.current_tier = record.tier;
        state.size_bytes = record.size_bytes;
        state.total_latency_ns += record.latency_ns;
        state.last_access_op = op;
        if record.is_read {
            state.reads += 1;
        } else {
            state.writes += 1;
        }
        if state.is_hot() {
            state.last_hot_op = Some(op);
        }

        registered
    }

    /// Commit a completed migration of `lba` to `to_tier`.
    ///
    /// Resets the access count so the block has to earn its classification
    /// again on the new tier.
    pub fn apply_migration(&mut self, lba: LbaId, to_tier: Tier, op: u64) -> Result<&LbaState> {
        let state = self.lbas.get_mut(&lba).ok_or(Error::UnknownLba(lba))?;
        state.current_tier = to_tier;
        state.migration_count += 1;
        state.access_count = 0;
        state.last_migrated_op = Some(op);
        Ok(state)
    }

    pub fn get(&self, lba: LbaId) -> Option<&LbaState> {
        self.lbas.get(&lba)
    }

    /// Iterate tracked LBAs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &LbaState> {
        self.lbas.values()
    }

    pub fn len(&self) -> usize {
        self.lbas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lbas.is_empty()
    }

    pub fn hot_count(&self) -> usize {
        self.iter().filter(|s| s.is_hot()).count()
    }

    pub fn cold_count(&self) -> usize {
        self.iter().filter(|s| s.is_cold()).count()
    }

    /// Sum of current access counts.
    pub fn total_access_count(&self) -> u64 {
        self.iter().map(|s| s.access_count).sum()
    }

    /// Number of LBAs with at least one completed migration.
    pub fn migrated_count(&self) -> usize {
        self.iter().filter(|s| s.migration_count > 0).count()
    }

    pub fn total_migrations(&self) -> u64 {
        self.iter().map(|s| s.migration_count).sum()
    }
}
