//! Host-side collaborator
//!
//! Serves requests on behalf of a storage front end: places blocks, reports
//! every access to the [`MigrationEngine`] and drives its periodic update.
//!
//! ```text
//! SyntheticWorkload ──▶ SimulationHost::serve ──▶ record_access
//!                              │
//!                       PeriodicTrigger ──every N──▶ periodic_update
//! ```

mod workload;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, instrument};

pub use workload::{service_latency_ns, IoRequest, SyntheticWorkload, WorkloadConfig};

use crate::domain::ports::{LbaId, Tier, TierCapacities, TierUsage};
use crate::migrator::{MigrationEngine, UpdateResult};

/// Requests between two periodic updates.
pub const CHECK_INTERVAL: u64 = 50;

/// Update results kept for inspection; older ones are dropped.
pub const RECENT_UPDATES: usize = 64;

// =============================================================================
// Periodic Trigger
// =============================================================================

/// Fires once every `interval` ticks.
#[derive(Debug, Clone)]
pub struct PeriodicTrigger {
    interval: u64,
    counter: u64,
}

impl Default for PeriodicTrigger {
    fn default() -> Self {
        Self::new(CHECK_INTERVAL)
    }
}

impl PeriodicTrigger {
    /// An interval of zero is treated as one.
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            counter: 0,
        }
    }

    /// Count one request; true when this request completes an interval.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        self.counter % self.interval == 0
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn count(&self) -> u64 {
        self.counter
    }
}

// =============================================================================
// Simulation Host
// =============================================================================

/// Drives an engine with a request stream.
#[derive(Debug)]
pub struct SimulationHost {
    engine: Arc<MigrationEngine>,
    trigger: PeriodicTrigger,
    capacities: TierCapacities,
    /// Where each block currently sits and how large it is
    placements: HashMap<LbaId, (Tier, u64)>,
    usage: TierUsage,
    recent: VecDeque<UpdateResult>,
    update_count: u64,
    enqueued_total: u64,
}

impl SimulationHost {
    pub fn new(engine: Arc<MigrationEngine>, check_interval: u64) -> Self {
        let capacities = engine.config().capacities();
        Self {
            engine,
            trigger: PeriodicTrigger::new(check_interval),
            capacities,
            placements: HashMap::new(),
            usage: TierUsage::default(),
            recent: VecDeque::with_capacity(RECENT_UPDATES),
            update_count: 0,
            enqueued_total: 0,
        }
    }

    pub fn engine(&self) -> &Arc<MigrationEngine> {
        &self.engine
    }

    /// Current per-tier byte usage as the host sees it.
    pub fn usage(&self) -> TierUsage {
        self.usage
    }

    /// The last [`RECENT_UPDATES`] update results, oldest first.
    pub fn recent_updates(&self) -> &VecDeque<UpdateResult> {
        &self.recent
    }

    /// Periodic updates run so far.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Migrations admitted across all periodic updates.
    pub fn enqueued_total(&self) -> u64 {
        self.enqueued_total
    }

    /// Serve one request.
    ///
    /// Returns the update result when this request triggered a periodic
    /// update.
    pub fn serve(&mut self, request: &IoRequest) -> Option<&UpdateResult> {
        let tier = self.place(request);
        let latency_ns = service_latency_ns(tier, request.size_bytes);

        self.engine.record_access(
            request.lba,
            tier,
            latency_ns,
            request.size_bytes,
            request.is_read,
        );

        if !self.trigger.tick() {
            return None;
        }

        self.reconcile();
        let result = self
            .engine
            .periodic_update(self.usage.ssd_bytes, self.usage.ram_bytes);
        debug!(
            "Periodic update after {} requests: {} enqueued, queue {}",
            self.trigger.count(),
            result.enqueued_count,
            result.queue_len
        );

        self.update_count += 1;
        self.enqueued_total += result.enqueued_count as u64;
        if self.recent.len() == RECENT_UPDATES {
            self.recent.pop_front();
        }
        self.recent.push_back(result);
        self.recent.back()
    }

    /// Serve a whole stream, yielding to the runtime after each update so
    /// the executor can make progress.
    #[instrument(skip(self, requests), fields(requests = requests.len()))]
    pub async fn run(&mut self, requests: &[IoRequest]) {
        for request in requests {
            if self.serve(request).is_some() {
                tokio::task::yield_now().await;
            }
        }
        info!(
            "Served {} requests, {} periodic updates",
            self.trigger.count(),
            self.update_count
        );
    }

    /// Move the usage of blocks the engine relocated since they were last
    /// served, so the next report matches where blocks actually sit.
    fn reconcile(&mut self) {
        let tiers = self.engine.tiers();
        for (lba, (placed, bytes)) in self.placements.iter_mut() {
            let Some(&tier) = tiers.get(lba) else {
                continue;
            };
            if *placed != tier {
                self.usage.remove(*placed, *bytes);
                self.usage.add(tier, *bytes);
                *placed = tier;
            }
        }
    }

    /// Decide the tier that serves `request` and keep byte usage in step.
    ///
    /// Known blocks go where the engine says they are; new blocks go to the
    /// requested tier, falling back to slower tiers when it has no room.
    fn place(&mut self, request: &IoRequest) -> Tier {
        let size = request.size_bytes.max(0) as u64;

        if let Some(tier) = self.engine.current_tier(request.lba) {
            if let Some((placed, bytes)) = self.placements.get_mut(&request.lba) {
                if *placed != tier {
                    self.usage.remove(*placed, *bytes);
                    self.usage.add(tier, *bytes);
                    *placed = tier;
                }
            }
            return tier;
        }

        let mut tier = request.initial_tier;
        while self
            .usage
            .ensure_room(tier, size, &self.capacities)
            .is_err()
        {
            match tier.slower() {
                Some(next) => tier = next,
                None => break,
            }
        }
        self.usage.add(tier, size);
        self.placements.insert(request.lba, (tier, size));
        tier
    }
}
