//! Migration Engine - the coordinator
//!
//! Owns all mutable migration state behind one coarse lock and wires the
//! pipeline together:
//!
//! ```text
//! record_access ──▶ AccessTracker
//!
//! periodic_update ──▶ CandidateSelector ──▶ MigrationQueue ──▶ RewardEngine
//!                                                │
//!                       MigrationExecutor (task) ◀┘  dequeue / commit
//! ```
//!
//! # Guarantees
//!
//! 1. Queue length never exceeds [`QUEUE_CAPACITY`](super::queue::QUEUE_CAPACITY)
//! 2. At most one queued or in-progress migration per LBA
//! 3. `migrations_completed <= migrations_enqueued` whenever the lock is free
//! 4. The lock is never held across the simulated transfer

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::counters::Counters;
use super::executor::{ExecutorConfig, MigrationExecutor};
use super::queue::{Admission, MigrationQueue, MigrationStatus, QueuedMigration};
use super::report::MigrationStatistics;
use super::reward::{RewardEngine, RewardEvaluation};
use super::selector::{CandidateSelector, MigrationCandidate, SelectorConfig};
use super::tracker::{AccessRecord, AccessTracker, LbaState};
use crate::adapters::{LoggingEventPublisher, SimulatedTransfer};
use crate::domain::events::MigrationEvent;
use crate::domain::ports::{
    EventPublisher, LbaId, Tier, TierCapacities, TierUsage, TransferBackend,
};
use crate::error::{Error, Result};
use crate::metrics::EngineMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the migration engine
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Candidate selection and tier capacities
    pub selector: SelectorConfig,

    /// Background executor behaviour
    pub executor: ExecutorConfig,
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.selector.capacity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::Config(format!(
                "capacity_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.selector.max_candidates == 0 {
            return Err(Error::Config("max_candidates must be positive".to_string()));
        }
        if self.executor.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be positive".to_string()));
        }
        self.executor.transfer_cost.validate()?;
        if self.executor.shutdown_timeout.is_zero() {
            return Err(Error::Config(
                "shutdown_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capacities(&self) -> TierCapacities {
        self.selector.capacities
    }
}

// =============================================================================
// Shared State
// =============================================================================

/// Everything guarded by the engine lock.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) tracker: AccessTracker,
    pub(crate) queue: MigrationQueue,
    pub(crate) counters: Counters,
    pub(crate) reward: RewardEngine,
    /// Last host-reported usage, adjusted by completed moves
    pub(crate) usage: TierUsage,
    /// Migration the executor has dequeued and not yet resolved
    pub(crate) in_progress: Option<QueuedMigration>,
}

pub(crate) type SharedState = Arc<Mutex<EngineState>>;

impl EngineState {
    /// Apply a finished transfer to the tracked state.
    ///
    /// Fails without side effects when the LBA is unknown, no longer sits on
    /// the source tier, or the destination has no room for it.
    pub(crate) fn commit(
        &mut self,
        migration: &QueuedMigration,
        capacities: &TierCapacities,
    ) -> Result<()> {
        let candidate = &migration.candidate;
        let lba = candidate.lba;
        let state = self.tracker.get(lba).ok_or(Error::UnknownLba(lba))?;

        if state.current_tier != candidate.from_tier {
            return Err(Error::StaleMigration {
                lba,
                expected: candidate.from_tier,
                actual: state.current_tier,
            });
        }

        let size = state.footprint();
        self.usage.ensure_room(candidate.to_tier, size, capacities)?;

        let now = self.counters.total_operations;
        self.tracker.apply_migration(lba, candidate.to_tier, now)?;
        self.usage.remove(candidate.from_tier, size);
        self.usage.add(candidate.to_tier, size);
        Ok(())
    }

    /// Give up ownership of the in-progress migration `id`.
    ///
    /// Returns `false` when it was already resolved elsewhere, in which case
    /// the caller must not commit or count it.
    pub(crate) fn release_in_progress(&mut self, id: uuid::Uuid) -> bool {
        if self.in_progress.as_ref().is_some_and(|m| m.id == id) {
            self.in_progress = None;
            true
        } else {
            false
        }
    }

    /// Resolve an abandoned in-progress migration as failed.
    pub(crate) fn fail_in_progress(&mut self) -> Option<QueuedMigration> {
        let mut migration = self.in_progress.take()?;
        migration.status = MigrationStatus::Failed;
        self.counters.migrations_failed += 1;
        self.queue.finish(migration.lba());
        Some(migration)
    }

    fn statistics(&self) -> MigrationStatistics {
        MigrationStatistics {
            total_lbas_tracked: self.counters.total_lbas_tracked,
            hot_lbas: self.tracker.hot_count() as u64,
            cold_lbas: self.tracker.cold_count() as u64,
            total_lba_operations: self.tracker.total_access_count(),
            total_requests: self.counters.total_operations,
            lbas_migrated: self.tracker.migrated_count() as u64,
            total_migrations_across_lbas: self.tracker.total_migrations(),
            migrations_enqueued: self.counters.migrations_enqueued,
            migrations_completed: self.counters.migrations_completed,
            migrations_failed: self.counters.migrations_failed,
            last_reward: self.reward.last_reward(),
            avg_reward: self.reward.average_reward(),
            migration_queue_size: self.queue.len() as u64,
            migration_queue_full: self.queue.is_full(),
        }
    }
}

// =============================================================================
// Update Result
// =============================================================================

/// Summary of one periodic update, returned to the host for logging.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    /// Candidates proposed by the selector this cycle
    pub selected: usize,

    /// Candidates admitted to the queue this cycle
    pub enqueued_count: usize,

    /// The admitted candidates, in priority order
    pub admitted: Vec<MigrationCandidate>,

    pub reward: f64,

    pub evaluation: RewardEvaluation,

    /// Counters as they stood when the reward was computed
    pub counters: Counters,

    /// Queue length after admission
    pub queue_len: usize,
}

// =============================================================================
// Migration Engine
// =============================================================================

/// Coordinates tracking, selection, admission, execution and reward.
pub struct MigrationEngine {
    config: EngineConfig,
    selector: CandidateSelector,
    state: SharedState,
    metrics: Arc<EngineMetrics>,
    backend: Arc<dyn TransferBackend>,
    events: Arc<dyn EventPublisher>,
    shutdown: CancellationToken,
    executor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MigrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl MigrationEngine {
    /// Create an engine with a simulated transfer backend and logging events.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>> {
        let backend = Arc::new(SimulatedTransfer::new(config.executor.transfer_cost));
        let events = Arc::new(LoggingEventPublisher::debug_level());
        Self::with_ports(config, backend, events)
    }

    /// Create an engine with explicit collaborators.
    pub fn with_ports(
        config: EngineConfig,
        backend: Arc<dyn TransferBackend>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        Ok(Arc::new(Self {
            selector: CandidateSelector::new(config.selector.clone()),
            config,
            state: Arc::new(Mutex::new(EngineState::default())),
            metrics: Arc::new(EngineMetrics::new()?),
            backend,
            events,
            shutdown: CancellationToken::new(),
            executor: Mutex::new(None),
        }))
    }

    /// Spawn the background executor on the current Tokio runtime.
    ///
    /// Does nothing if it is already running or the engine was shut down.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.executor.lock();
        if slot.is_some() || self.shutdown.is_cancelled() {
            return;
        }

        let executor = MigrationExecutor::new(
            self.config.executor.clone(),
            self.config.capacities(),
            self.state.clone(),
            self.backend.clone(),
            self.events.clone(),
            self.metrics.clone(),
            self.shutdown.child_token(),
        );
        *slot = Some(tokio::spawn(executor.run()));
        info!("Migration engine started");
    }

    /// Whether the executor task is live.
    pub fn is_running(&self) -> bool {
        self.executor
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Record one I/O request.
    ///
    /// The reported tier is the placement decision for this request and
    /// overrides the tracked tier.
    pub fn record_access(
        &self,
        lba: impl Into<LbaId>,
        tier: Tier,
        latency_ns: f64,
        size_bytes: i64,
        is_read: bool,
    ) {
        let record = AccessRecord {
            lba: lba.into(),
            tier,
            latency_ns,
            size_bytes,
            is_read,
        };

        let tracked = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let op = state.counters.record_request(latency_ns);
            if state.tracker.record_access(op, &record) {
                state.counters.total_lbas_tracked += 1;
            }
            state.counters.total_lbas_tracked
        };

        self.metrics.record_request(tracked);
    }

    /// Run one selection / admission / reward cycle.
    ///
    /// `ssd_usage` and `ram_usage` are the host's current byte usage figures.
    /// Holds the lock for selection and admission only; execution happens in
    /// the executor task.
    #[instrument(skip(self))]
    pub fn periodic_update(&self, ssd_usage: u64, ram_usage: u64) -> UpdateResult {
        let result = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.usage = TierUsage::new(ssd_usage, ram_usage);

            let now = state.counters.total_operations;
            let candidates =
                self.selector
                    .select(&state.tracker, state.queue.in_flight(), &state.usage, now);
            let selected = candidates.len();

            let mut admitted = Vec::new();
            for candidate in candidates {
                match state.queue.enqueue(candidate.clone()) {
                    Admission::Admitted => {
                        state.counters.migrations_enqueued += 1;
                        admitted.push(candidate);
                    }
                    Admission::QueueFull => break,
                    Admission::AlreadyInFlight => {
                        warn!(lba = %candidate.lba, "Rejected duplicate in-flight migration");
                    }
                }
            }

            let counters = state.counters;
            let evaluation = state.reward.evaluate(&mut state.counters);

            UpdateResult {
                selected,
                enqueued_count: admitted.len(),
                admitted,
                reward: evaluation.reward,
                evaluation,
                counters,
                queue_len: state.queue.len(),
            }
        };

        self.metrics.record_enqueued(result.enqueued_count);
        self.metrics.set_queue_depth(result.queue_len);
        self.metrics.set_reward(result.reward);

        if result.enqueued_count > 0 {
            info!(
                "Enqueued {} migrations ({} selected, queue {})",
                result.enqueued_count, result.selected, result.queue_len
            );
            for c in result.admitted.iter().take(3) {
                debug!(
                    "  LBA {}: {} -> {} ({}, score: {:.2})",
                    c.lba, c.from_tier, c.to_tier, c.reason, c.priority_score
                );
            }
        }
        info!(
            "Migration reward: {:.6e}, Avg latency: {:.0}ns, completed since last: {}",
            result.reward, result.evaluation.average_latency_ns, result.evaluation.completed_delta
        );

        result
    }

    /// Stop the executor and return the final statistics.
    ///
    /// Waits at most `shutdown_timeout` for the executor to observe the stop
    /// signal; an in-progress migration is allowed to finish. Anything still
    /// queued stays queued and is reported as pending.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> MigrationStatistics {
        info!("Migration engine stopping");
        self.shutdown.cancel();

        let handle = self.executor.lock().take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            match tokio::time::timeout(self.config.executor.shutdown_timeout, handle).await {
                Ok(Ok(())) => debug!("Migration executor stopped"),
                Ok(Err(e)) => {
                    error!("Migration executor task failed: {}", e);
                    self.fail_abandoned().await;
                }
                Err(_) => {
                    warn!(
                        "Migration executor did not stop within {:?}, aborting",
                        self.config.executor.shutdown_timeout
                    );
                    abort.abort();
                    self.fail_abandoned().await;
                }
            }
        }

        let stats = self.statistics();
        if stats.migration_queue_size > 0 {
            info!(
                "{} migrations left pending in queue",
                stats.migration_queue_size
            );
        }
        stats
    }

    /// Count the migration a stopped executor left behind as failed.
    async fn fail_abandoned(&self) {
        let Some(migration) = self.state.lock().fail_in_progress() else {
            return;
        };
        self.metrics.record_outcome(false);

        let c = &migration.candidate;
        warn!(
            "Migration of LBA {} ({} -> {}) abandoned at shutdown",
            c.lba, c.from_tier, c.to_tier
        );
        let event = MigrationEvent::failed(
            migration.id,
            c.lba,
            c.from_tier,
            c.to_tier,
            "executor stopped before the transfer finished",
        );
        if let Err(e) = self.events.publish(event).await {
            warn!("Failed to publish migration event: {}", e);
        }
    }

    /// Current statistics snapshot.
    pub fn statistics(&self) -> MigrationStatistics {
        self.state.lock().statistics()
    }

    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    pub fn lba_state(&self, lba: impl Into<LbaId>) -> Option<LbaState> {
        self.state.lock().tracker.get(lba.into()).cloned()
    }

    /// Tier the engine believes `lba` resides on.
    pub fn current_tier(&self, lba: impl Into<LbaId>) -> Option<Tier> {
        self.state
            .lock()
            .tracker
            .get(lba.into())
            .map(|s| s.current_tier)
    }

    /// Tier of every tracked LBA, taken under one lock.
    pub fn tiers(&self) -> BTreeMap<LbaId, Tier> {
        self.state
            .lock()
            .tracker
            .iter()
            .map(|s| (s.id, s.current_tier))
            .collect()
    }

    /// Migrations waiting in the queue.
    pub fn pending_migrations(&self) -> Vec<QueuedMigration> {
        self.state.lock().queue.pending().cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn usage(&self) -> TierUsage {
        self.state.lock().usage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Give the executor up to `timeout` to empty the queue.
    ///
    /// Returns `true` if nothing is queued or in progress when it returns.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.lock().queue.in_flight().is_empty() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.config.executor.poll_interval).await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventCollector, TransferCost};
    use crate::migrator::selector::MigrationReason;
    use assert_matches::assert_matches;

    fn engine() -> Arc<MigrationEngine> {
        MigrationEngine::new(EngineConfig::default()).unwrap()
    }

    fn touch(engine: &MigrationEngine, lba: u64, tier: Tier, times: usize) {
        for _ in 0..times {
            engine.record_access(lba, tier, 1000.0, 4096, true);
        }
    }

    // =========================================================================
    // Configuration Tests
    // =========================================================================

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selector.max_candidates, 10);
        assert_eq!(config.selector.capacity_threshold, 0.9);
        assert_eq!(config.executor.poll_interval, Duration::from_millis(10));
        assert_eq!(config.executor.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_engine_config_rejects_bad_threshold() {
        let mut config = EngineConfig::default();
        config.selector.capacity_threshold = 1.5;
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.selector.capacity_threshold = 0.0;
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_engine_config_rejects_zero_poll_interval() {
        let mut config = EngineConfig::default();
        config.executor.poll_interval = Duration::ZERO;
        assert_matches!(
            MigrationEngine::new(config).map(|_| ()),
            Err(Error::Config(_))
        );
    }

    #[test]
    fn test_engine_config_rejects_unusable_bandwidth() {
        let mut config = EngineConfig::default();
        config.executor.transfer_cost = TransferCost::Bandwidth {
            overhead: Duration::ZERO,
            bytes_per_sec: f64::INFINITY,
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    // =========================================================================
    // Tracking Tests
    // =========================================================================

    #[test]
    fn test_record_access_updates_counters() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 3);
        touch(&engine, 2, Tier::Hdd, 1);

        let counters = engine.counters();
        assert_eq!(counters.total_operations, 4);
        assert_eq!(counters.total_lbas_tracked, 2);
        assert_eq!(counters.requests_accumulator, 4);
        assert_eq!(counters.latency_accumulator_ns, 4000.0);
        assert_eq!(engine.lba_state(1u64).unwrap().access_count, 3);
        assert_eq!(engine.current_tier(2u64), Some(Tier::Hdd));
    }

    // =========================================================================
    // Periodic Update Tests
    // =========================================================================

    #[test]
    fn test_periodic_update_enqueues_hot_blocks() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        touch(&engine, 2, Tier::Ssd, 2);

        let result = engine.periodic_update(0, 0);

        assert_eq!(result.selected, 1);
        assert_eq!(result.enqueued_count, 1);
        assert_eq!(result.admitted[0].lba, LbaId(1));
        assert_eq!(result.admitted[0].reason, MigrationReason::HotNeedsPromotion);
        assert_eq!(result.queue_len, 1);
        assert_eq!(result.counters.requests_accumulator, 7);
        assert_eq!(engine.counters().migrations_enqueued, 1);
        assert_eq!(engine.counters().requests_accumulator, 0);
    }

    #[test]
    fn test_periodic_update_does_not_requeue_in_flight() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);

        assert_eq!(engine.periodic_update(0, 0).enqueued_count, 1);
        assert_eq!(engine.periodic_update(0, 0).enqueued_count, 0);
        assert_eq!(engine.queue_len(), 1);
    }

    #[test]
    fn test_periodic_update_stops_at_capacity() {
        let engine = engine();
        for lba in 0..25 {
            touch(&engine, lba, Tier::Hdd, 5);
        }

        let first = engine.periodic_update(0, 0);
        assert_eq!(first.enqueued_count, 10);
        assert_eq!(first.queue_len, 10);

        let second = engine.periodic_update(0, 0);
        assert_eq!(second.selected, 10);
        assert_eq!(second.enqueued_count, 0);
        assert!(engine.statistics().migration_queue_full);
        assert_eq!(engine.counters().migrations_enqueued, 10);
    }

    #[test]
    fn test_reward_reflects_delayed_completions() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        engine.periodic_update(0, 0);

        // Simulate the executor completing the migration between cycles
        {
            let mut state = engine.state.lock();
            let migration = state.queue.dequeue_next().unwrap();
            state.commit(&migration, &TierCapacities::default()).unwrap();
            state.queue.finish(migration.lba());
            state.counters.migrations_completed += 1;
        }

        touch(&engine, 2, Tier::Hdd, 2);
        let result = engine.periodic_update(0, 0);
        assert_eq!(result.evaluation.completed_delta, 1);
        assert_eq!(result.evaluation.average_latency_ns, 1000.0);
        assert_eq!(result.reward, 1.0 / 1000.0);
    }

    // =========================================================================
    // Commit Tests
    // =========================================================================

    #[test]
    fn test_commit_moves_block_and_adjusts_usage() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        engine.periodic_update(8192, 0);

        let mut state = engine.state.lock();
        let migration = state.queue.dequeue_next().unwrap();
        state.commit(&migration, &TierCapacities::default()).unwrap();

        let lba = state.tracker.get(LbaId(1)).unwrap();
        assert_eq!(lba.current_tier, Tier::Ram);
        assert_eq!(lba.migration_count, 1);
        assert_eq!(lba.access_count, 0);
        assert_eq!(state.usage.used(Tier::Ram), 4096);
        assert_eq!(state.usage.used(Tier::Ssd), 4096);
    }

    #[test]
    fn test_commit_fails_when_destination_full() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        engine.periodic_update(0, 0);

        let mut state = engine.state.lock();
        let migration = state.queue.dequeue_next().unwrap();
        state.usage.ram_bytes = TierCapacities::default().ram_bytes;

        assert_matches!(
            state.commit(&migration, &TierCapacities::default()),
            Err(Error::TierFull { tier: Tier::Ram, .. })
        );
        assert_eq!(state.tracker.get(LbaId(1)).unwrap().current_tier, Tier::Ssd);
    }

    #[test]
    fn test_commit_rejects_stale_candidate() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        engine.periodic_update(0, 0);

        // Host relocates the block before the executor gets to it
        touch(&engine, 1, Tier::Hdd, 1);

        let mut state = engine.state.lock();
        let migration = state.queue.dequeue_next().unwrap();
        assert_matches!(
            state.commit(&migration, &TierCapacities::default()),
            Err(Error::StaleMigration { actual: Tier::Hdd, .. })
        );
    }

    // =========================================================================
    // Lifecycle Tests
    // =========================================================================

    #[tokio::test]
    async fn test_shutdown_before_start_reports_pending() {
        let engine = engine();
        touch(&engine, 1, Tier::Ssd, 5);
        engine.periodic_update(0, 0);

        let stats = engine.shutdown().await;
        assert_eq!(stats.migration_queue_size, 1);
        assert_eq!(stats.migrations_completed, 0);

        // No executor after shutdown
        engine.start();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_executor_drains_queue() {
        let events = Arc::new(InMemoryEventCollector::new());
        let engine = MigrationEngine::with_ports(
            EngineConfig::default(),
            Arc::new(SimulatedTransfer::default()),
            events.clone(),
        )
        .unwrap();
        engine.start();
        assert!(engine.is_running());

        touch(&engine, 1, Tier::Ssd, 5);
        touch(&engine, 2, Tier::Hdd, 6);
        assert_eq!(engine.periodic_update(0, 0).enqueued_count, 2);

        assert!(engine.wait_idle(Duration::from_secs(2)).await);
        let stats = engine.shutdown().await;

        assert_eq!(stats.migrations_completed, 2);
        assert_eq!(stats.migration_queue_size, 0);
        assert_eq!(stats.lbas_migrated, 2);
        assert_eq!(engine.current_tier(1u64), Some(Tier::Ram));
        assert_eq!(engine.current_tier(2u64), Some(Tier::Ssd));
        assert_eq!(events.events_of_type("MigrationCompleted").len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_timeout_fails_in_progress_migration() {
        let mut config = EngineConfig::default();
        config.executor.transfer_cost = TransferCost::Fixed(Duration::from_secs(10));
        config.executor.shutdown_timeout = Duration::from_millis(100);
        let events = Arc::new(InMemoryEventCollector::new());
        let engine = MigrationEngine::with_ports(
            config.clone(),
            Arc::new(SimulatedTransfer::new(config.executor.transfer_cost)),
            events.clone(),
        )
        .unwrap();

        for lba in 1..=3 {
            touch(&engine, lba, Tier::Ssd, 5);
        }
        assert_eq!(engine.periodic_update(0, 0).enqueued_count, 3);

        // Executor picks up LBA 1 and sits in its transfer
        engine.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = engine.shutdown().await;

        assert_eq!(stats.migrations_completed, 0);
        assert_eq!(stats.migrations_failed, 1);
        assert_eq!(stats.migration_queue_size, 2);
        assert_eq!(
            stats.migrations_completed + stats.migrations_failed + stats.migration_queue_size,
            stats.migrations_enqueued
        );

        {
            let state = engine.state.lock();
            assert!(state.in_progress.is_none());
            assert!(!state.queue.is_in_flight(LbaId(1)));
            assert!(state.queue.is_in_flight(LbaId(2)));
        }
        assert_eq!(engine.current_tier(1u64), Some(Tier::Ssd));
        assert_eq!(events.events_of_type("MigrationFailed").len(), 1);
        assert_eq!(events.events_for(LbaId(1)).len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let engine = engine();
        engine.start();

        let first = engine.shutdown().await;
        let second = engine.shutdown().await;
        assert_eq!(first, second);
        assert!(!engine.is_running());
    }
}
