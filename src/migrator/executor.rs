//! Migration Executor - the background worker
//!
//! Drains the migration queue on its own schedule, independent of the
//! periodic trigger. Each migration goes through three steps:
//!
//! 1. Dequeue under the engine lock
//! 2. Transfer through the [`TransferBackend`] with the lock released
//! 3. Commit (or fail) under the lock and update the counters
//!
//! Failures are counted and published; they never stop the loop and are not
//! retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::engine::SharedState;
use super::queue::{MigrationStatus, QueuedMigration};
use crate::adapters::TransferCost;
use crate::domain::events::MigrationEvent;
use crate::domain::ports::{EventPublisher, TierCapacities, TransferBackend, TransferRequest};
use crate::error::Result;
use crate::metrics::EngineMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the executor task
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Interval between queue polls when idle
    pub poll_interval: Duration,

    /// Cost model used by the default simulated transfer backend
    pub transfer_cost: TransferCost,

    /// Maximum time shutdown waits for the loop to stop
    pub shutdown_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            transfer_cost: TransferCost::Instant,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Background worker that performs queued migrations.
pub struct MigrationExecutor {
    config: ExecutorConfig,
    capacities: TierCapacities,
    state: SharedState,
    backend: Arc<dyn TransferBackend>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<EngineMetrics>,
    shutdown: CancellationToken,
}

impl MigrationExecutor {
    pub(crate) fn new(
        config: ExecutorConfig,
        capacities: TierCapacities,
        state: SharedState,
        backend: Arc<dyn TransferBackend>,
        events: Arc<dyn EventPublisher>,
        metrics: Arc<EngineMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            capacities,
            state,
            backend,
            events,
            metrics,
            shutdown,
        }
    }

    /// Run until the shutdown token is cancelled.
    ///
    /// Stop is checked before every dequeue, so queued entries are left in
    /// place once shutdown begins. A migration already in progress finishes.
    #[instrument(skip(self), name = "migration_executor")]
    pub async fn run(self) {
        info!(
            "Starting migration executor (poll every {:?})",
            self.config.poll_interval
        );

        let mut tick = interval(self.config.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Migration executor shutting down");
                    break;
                }

                _ = tick.tick() => {
                    self.drain().await;
                }
            }
        }
    }

    /// Execute queued migrations until the queue is empty or stop is signalled.
    async fn drain(&self) {
        while !self.shutdown.is_cancelled() {
            let Some((migration, request)) = self.take_next() else {
                break;
            };
            let finished = self.execute(migration, request).await;
            debug!(
                "Migration {} for LBA {} finished: {}",
                finished.id,
                finished.lba(),
                finished.status
            );
        }
    }

    /// Dequeue the oldest migration and build its transfer request.
    fn take_next(&self) -> Option<(QueuedMigration, TransferRequest)> {
        let (migration, size_bytes, depth) = {
            let mut state = self.state.lock();
            let migration = state.queue.dequeue_next()?;
            state.in_progress = Some(migration.clone());
            let size_bytes = state
                .tracker
                .get(migration.lba())
                .map_or(0, |s| s.footprint());
            (migration, size_bytes, state.queue.len())
        };
        self.metrics.set_queue_depth(depth);

        let request = TransferRequest {
            migration_id: migration.id,
            lba: migration.lba(),
            from_tier: migration.candidate.from_tier,
            to_tier: migration.candidate.to_tier,
            size_bytes,
        };
        Some((migration, request))
    }

    /// Perform one migration and record its outcome.
    async fn execute(
        &self,
        mut migration: QueuedMigration,
        request: TransferRequest,
    ) -> QueuedMigration {
        self.publish(MigrationEvent::started(
            request.migration_id,
            request.lba,
            request.from_tier,
            request.to_tier,
        ))
        .await;

        // Lock is not held while the transfer runs.
        let transfer = self.backend.transfer(&request).await;

        let outcome: Option<Result<Duration>> = {
            let mut state = self.state.lock();
            if state.release_in_progress(migration.id) {
                let outcome = match transfer {
                    Ok(elapsed) => state.commit(&migration, &self.capacities).map(|_| elapsed),
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(_) => state.counters.migrations_completed += 1,
                    Err(_) => state.counters.migrations_failed += 1,
                }
                state.queue.finish(request.lba);
                Some(outcome)
            } else {
                None
            }
        };

        // Shutdown already counted it as abandoned
        let Some(outcome) = outcome else {
            debug!("Migration {} resolved during shutdown", migration.id);
            migration.status = MigrationStatus::Failed;
            return migration;
        };

        let event = match outcome {
            Ok(elapsed) => {
                migration.status = MigrationStatus::Completed;
                self.metrics.record_outcome(true);
                debug!(
                    "Migrated LBA {}: {} -> {} in {:?}",
                    request.lba, request.from_tier, request.to_tier, elapsed
                );
                MigrationEvent::completed(
                    request.migration_id,
                    request.lba,
                    request.from_tier,
                    request.to_tier,
                    elapsed.as_millis() as u64,
                )
            }
            Err(e) => {
                migration.status = MigrationStatus::Failed;
                self.metrics.record_outcome(false);
                warn!(
                    "Migration of LBA {} ({} -> {}) failed: {}",
                    request.lba, request.from_tier, request.to_tier, e
                );
                MigrationEvent::failed(
                    request.migration_id,
                    request.lba,
                    request.from_tier,
                    request.to_tier,
                    e.to_string(),
                )
            }
        };
        self.publish(event).await;

        migration
    }

    async fn publish(&self, event: MigrationEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!("Failed to publish migration event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventCollector, SimulatedTransfer};
    use crate::domain::ports::{LbaId, Tier};
    use crate::error::Error;
    use crate::migrator::engine::EngineState;
    use crate::migrator::selector::{MigrationCandidate, MigrationReason};
    use crate::migrator::tracker::AccessRecord;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FailingTransfer;

    #[async_trait]
    impl TransferBackend for FailingTransfer {
        async fn transfer(&self, request: &TransferRequest) -> Result<Duration> {
            Err(Error::Transfer {
                lba: request.lba,
                reason: "device offline".to_string(),
            })
        }
    }

    struct Harness {
        state: SharedState,
        events: Arc<InMemoryEventCollector>,
        executor: MigrationExecutor,
    }

    fn harness(backend: Arc<dyn TransferBackend>) -> Harness {
        let state: SharedState = Arc::new(Mutex::new(EngineState::default()));
        let events = Arc::new(InMemoryEventCollector::new());
        let executor = MigrationExecutor::new(
            ExecutorConfig::default(),
            TierCapacities::default(),
            state.clone(),
            backend,
            events.clone(),
            Arc::new(EngineMetrics::new().unwrap()),
            CancellationToken::new(),
        );
        Harness {
            state,
            events,
            executor,
        }
    }

    fn seed(state: &SharedState, lba: u64, tier: Tier) {
        let mut guard = state.lock();
        let op = guard.counters.record_request(10.0);
        guard.tracker.record_access(
            op,
            &AccessRecord {
                lba: LbaId(lba),
                tier,
                latency_ns: 10.0,
                size_bytes: 4096,
                is_read: true,
            },
        );
    }

    fn admit(state: &SharedState, lba: u64, from_tier: Tier, to_tier: Tier) {
        let mut guard = state.lock();
        let admission = guard.queue.enqueue(MigrationCandidate {
            lba: LbaId(lba),
            from_tier,
            to_tier,
            reason: MigrationReason::HotNeedsPromotion,
            priority_score: 5.0,
        });
        assert!(admission.is_admitted());
        guard.counters.migrations_enqueued += 1;
    }

    #[tokio::test]
    async fn test_drain_completes_in_fifo_order() {
        let h = harness(Arc::new(SimulatedTransfer::default()));
        seed(&h.state, 1, Tier::Ssd);
        seed(&h.state, 2, Tier::Hdd);
        admit(&h.state, 2, Tier::Hdd, Tier::Ssd);
        admit(&h.state, 1, Tier::Ssd, Tier::Ram);

        h.executor.drain().await;

        let state = h.state.lock();
        assert!(state.queue.is_empty());
        assert!(state.queue.in_flight().is_empty());
        assert_eq!(state.counters.migrations_completed, 2);
        assert_eq!(state.counters.migrations_failed, 0);
        assert_eq!(state.tracker.get(LbaId(1)).unwrap().current_tier, Tier::Ram);
        assert_eq!(state.tracker.get(LbaId(2)).unwrap().current_tier, Tier::Ssd);

        let started: Vec<LbaId> = h
            .events
            .events_of_type("MigrationStarted")
            .iter()
            .map(|e| e.lba())
            .collect();
        assert_eq!(started, vec![LbaId(2), LbaId(1)]);
    }

    #[tokio::test]
    async fn test_unknown_lba_is_a_failure() {
        let h = harness(Arc::new(SimulatedTransfer::default()));
        admit(&h.state, 42, Tier::Ssd, Tier::Ram);

        h.executor.drain().await;

        let state = h.state.lock();
        assert_eq!(state.counters.migrations_failed, 1);
        assert_eq!(state.counters.migrations_completed, 0);
        assert!(!state.queue.is_in_flight(LbaId(42)));
        assert_eq!(h.events.events_of_type("MigrationFailed").len(), 1);
    }

    #[tokio::test]
    async fn test_full_destination_fails_without_retry() {
        let h = harness(Arc::new(SimulatedTransfer::default()));
        seed(&h.state, 1, Tier::Ssd);
        admit(&h.state, 1, Tier::Ssd, Tier::Ram);
        h.state.lock().usage.ram_bytes = TierCapacities::default().ram_bytes;

        h.executor.drain().await;

        let state = h.state.lock();
        assert_eq!(state.counters.migrations_failed, 1);
        assert!(state.queue.is_empty());
        assert_eq!(state.tracker.get(LbaId(1)).unwrap().current_tier, Tier::Ssd);
        assert_eq!(state.tracker.get(LbaId(1)).unwrap().migration_count, 0);
    }

    #[tokio::test]
    async fn test_backend_error_does_not_stop_drain() {
        let h = harness(Arc::new(FailingTransfer));
        seed(&h.state, 1, Tier::Ssd);
        seed(&h.state, 2, Tier::Ssd);
        admit(&h.state, 1, Tier::Ssd, Tier::Ram);
        admit(&h.state, 2, Tier::Ssd, Tier::Ram);

        h.executor.drain().await;

        let state = h.state.lock();
        assert_eq!(state.counters.migrations_failed, 2);
        assert!(state.queue.is_empty());
    }

    #[tokio::test]
    async fn test_migration_resolved_at_shutdown_is_not_counted_twice() {
        let h = harness(Arc::new(SimulatedTransfer::default()));
        seed(&h.state, 1, Tier::Ssd);
        admit(&h.state, 1, Tier::Ssd, Tier::Ram);

        let (migration, request) = h.executor.take_next().unwrap();
        assert_eq!(
            h.state.lock().in_progress.as_ref().map(|m| m.id),
            Some(migration.id)
        );

        // Shutdown gives up on it while the transfer is still running
        let abandoned = h.state.lock().fail_in_progress().unwrap();
        assert_eq!(abandoned.status, MigrationStatus::Failed);

        let finished = h.executor.execute(migration, request).await;
        assert_eq!(finished.status, MigrationStatus::Failed);

        let state = h.state.lock();
        assert_eq!(state.counters.migrations_failed, 1);
        assert_eq!(state.counters.migrations_completed, 0);
        assert!(state.queue.in_flight().is_empty());
        assert_eq!(state.tracker.get(LbaId(1)).unwrap().current_tier, Tier::Ssd);
        assert!(h.events.events_of_type("MigrationCompleted").is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_executor_leaves_queue_untouched() {
        let h = harness(Arc::new(SimulatedTransfer::default()));
        seed(&h.state, 1, Tier::Ssd);
        admit(&h.state, 1, Tier::Ssd, Tier::Ram);

        h.executor.shutdown.cancel();
        let state = h.state.clone();
        h.executor.run().await;

        let state = state.lock();
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.counters.migrations_completed, 0);
    }
}
