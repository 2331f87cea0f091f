//! Synthetic workload generator
//!
//! Produces a deterministic request stream with a small hot set, a few
//! neutral blocks and a long tail of blocks touched once.

use serde::Serialize;

use crate::domain::ports::{LbaId, Tier};

/// Transfer rates used for nominal service latency, in MB/s.
const RAM_RATE_MBPS: f64 = 10_000.0;
const SSD_RATE_MBPS: f64 = 550.0;
const HDD_RATE_MBPS: f64 = 156.0;

/// First LBA id of each block group.
const HOT_BASE: u64 = 1;
const NEUTRAL_BASE: u64 = 1001;
const COLD_BASE: u64 = 2001;

/// Nominal time to serve `size_bytes` from `tier`.
pub fn service_latency_ns(tier: Tier, size_bytes: i64) -> f64 {
    let rate = match tier {
        Tier::Ram => RAM_RATE_MBPS,
        Tier::Ssd => SSD_RATE_MBPS,
        Tier::Hdd => HDD_RATE_MBPS,
    };
    // bytes / (MB/s) -> µs; x1000 -> ns
    size_bytes.max(0) as f64 / rate * 1000.0
}

/// One I/O request as the host sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IoRequest {
    pub lba: LbaId,
    pub size_bytes: i64,
    pub is_read: bool,
    /// Tier chosen for the block on first placement
    pub initial_tier: Tier,
}

/// Shape of the synthetic workload
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub hot_lbas: u64,
    /// Accesses spread round-robin over the hot set
    pub hot_accesses: u64,
    pub neutral_lbas: u64,
    pub neutral_accesses_each: u64,
    /// Blocks accessed exactly once
    pub cold_lbas: u64,
    pub block_size: i64,
    /// Every Nth request is a write
    pub write_every: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            hot_lbas: 7,
            hot_accesses: 566,
            neutral_lbas: 2,
            neutral_accesses_each: 3,
            cold_lbas: 108,
            block_size: 4096,
            write_every: 3,
        }
    }
}

impl WorkloadConfig {
    pub fn total_requests(&self) -> u64 {
        self.hot_accesses + self.neutral_lbas * self.neutral_accesses_each + self.cold_lbas
    }

    pub fn distinct_lbas(&self) -> u64 {
        self.hot_lbas + self.neutral_lbas + self.cold_lbas
    }
}

/// Deterministic request stream.
#[derive(Debug, Clone, Default)]
pub struct SyntheticWorkload {
    config: WorkloadConfig,
}

impl SyntheticWorkload {
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub fn hot_set(&self) -> impl Iterator<Item = LbaId> {
        (HOT_BASE..HOT_BASE + self.config.hot_lbas).map(LbaId)
    }

    pub fn neutral_set(&self) -> impl Iterator<Item = LbaId> {
        (NEUTRAL_BASE..NEUTRAL_BASE + self.config.neutral_lbas).map(LbaId)
    }

    pub fn cold_set(&self) -> impl Iterator<Item = LbaId> {
        (COLD_BASE..COLD_BASE + self.config.cold_lbas).map(LbaId)
    }

    /// Generate the request stream.
    ///
    /// Every sixth slot goes to the neutral/cold tail while it lasts; the
    /// rest cycle through the hot set. Hot blocks start off the fast tier,
    /// half of the cold tail starts on RAM.
    pub fn requests(&self) -> Vec<IoRequest> {
        let cfg = &self.config;

        let mut hot = (0..cfg.hot_accesses).filter(|_| cfg.hot_lbas > 0).map(|i| {
            let offset = i % cfg.hot_lbas;
            let tier = if offset % 2 == 0 { Tier::Ssd } else { Tier::Hdd };
            (LbaId(HOT_BASE + offset), tier)
        });

        let neutral = self.neutral_set().flat_map(|lba| {
            std::iter::repeat((lba, Tier::Ssd)).take(cfg.neutral_accesses_each as usize)
        });
        let cold = self.cold_set().enumerate().map(|(i, lba)| {
            let tier = if i % 2 == 0 { Tier::Ram } else { Tier::Hdd };
            (lba, tier)
        });
        let mut tail = neutral.chain(cold);

        let total = cfg.total_requests();
        let mut requests = Vec::with_capacity(total as usize);
        for i in 0..total {
            let next = if i % 6 == 0 {
                tail.next().or_else(|| hot.next())
            } else {
                hot.next().or_else(|| tail.next())
            };
            let Some((lba, initial_tier)) = next else {
                break;
            };
            requests.push(IoRequest {
                lba,
                size_bytes: cfg.block_size,
                is_read: cfg.write_every == 0 || (i + 1) % cfg.write_every != 0,
                initial_tier,
            });
        }
        requests
    }
}
