//! Engine Metrics - Prometheus exposition
//!
//! Mirrors the engine counters into a private Prometheus registry so a run
//! can be scraped or dumped in the text exposition format.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::Result;

const NAMESPACE: &str = "lba_migrator";

/// Outcome label values for `lba_migrator_migrations_total`
pub const OUTCOME_COMPLETED: &str = "completed";
pub const OUTCOME_FAILED: &str = "failed";

/// Prometheus metrics for one engine instance
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    requests_total: IntCounter,
    migrations_enqueued_total: IntCounter,
    migrations_total: IntCounterVec,
    queue_depth: IntGauge,
    tracked_lbas: IntGauge,
    reward: Gauge,
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("requests_total", &self.requests_total.get())
            .field("queue_depth", &self.queue_depth.get())
            .finish()
    }
}

impl EngineMetrics {
    /// Create and register all engine metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(
            Opts::new("requests_total", "Total I/O requests observed").namespace(NAMESPACE),
        )?;
        let migrations_enqueued_total = IntCounter::with_opts(
            Opts::new(
                "migrations_enqueued_total",
                "Migrations admitted to the queue",
            )
            .namespace(NAMESPACE),
        )?;
        let migrations_total = IntCounterVec::new(
            Opts::new("migrations_total", "Migrations resolved by the executor")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;
        let queue_depth = IntGauge::with_opts(
            Opts::new("queue_depth", "Migrations waiting in the queue").namespace(NAMESPACE),
        )?;
        let tracked_lbas = IntGauge::with_opts(
            Opts::new("tracked_lbas", "Distinct LBAs observed").namespace(NAMESPACE),
        )?;
        let reward = Gauge::with_opts(
            Opts::new("reward", "Last computed migration reward").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(migrations_enqueued_total.clone()))?;
        registry.register(Box::new(migrations_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(tracked_lbas.clone()))?;
        registry.register(Box::new(reward.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            migrations_enqueued_total,
            migrations_total,
            queue_depth,
            tracked_lbas,
            reward,
        })
    }

    pub fn record_request(&self, tracked_lbas: u64) {
        self.requests_total.inc();
        self.tracked_lbas.set(tracked_lbas as i64);
    }

    pub fn record_enqueued(&self, count: usize) {
        self.migrations_enqueued_total.inc_by(count as u64);
    }

    pub fn record_outcome(&self, completed: bool) {
        let outcome = if completed {
            OUTCOME_COMPLETED
        } else {
            OUTCOME_FAILED
        };
        self.migrations_total.with_label_values(&[outcome]).inc();
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as i64);
    }

    pub fn set_reward(&self, reward: f64) {
        self.reward.set(reward);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::error::Error::Internal(e.to_string()))
    }
}
