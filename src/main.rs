//! LBA Migrator
//!
//! Runs the migration engine against a deterministic synthetic workload and
//! prints the final statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          LBA Migrator                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  Synthetic   │───▶│  Simulation  │───▶│  Migration   │       │
//! │  │  Workload    │    │     Host     │    │   Engine     │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lba_migrator::adapters::TransferCost;
use lba_migrator::host::{SimulationHost, SyntheticWorkload, WorkloadConfig};
use lba_migrator::migrator::{EngineConfig, ExecutorConfig, SelectorConfig};
use lba_migrator::{MigrationEngine, Result, TierCapacities};

// =============================================================================
// CLI Arguments
// =============================================================================

/// LBA Migrator - access-driven block tiering simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of hot LBAs in the workload
    #[arg(long, env = "HOT_LBAS", default_value = "7")]
    hot_lbas: u64,

    /// Accesses spread over the hot set
    #[arg(long, env = "HOT_ACCESSES", default_value = "566")]
    hot_accesses: u64,

    /// Number of neutral LBAs in the workload
    #[arg(long, env = "NEUTRAL_LBAS", default_value = "2")]
    neutral_lbas: u64,

    /// Accesses per neutral LBA
    #[arg(long, env = "NEUTRAL_ACCESSES", default_value = "3")]
    neutral_accesses: u64,

    /// Number of LBAs touched exactly once
    #[arg(long, env = "COLD_LBAS", default_value = "108")]
    cold_lbas: u64,

    /// Block size in bytes
    #[arg(long, env = "BLOCK_SIZE", default_value = "4096")]
    block_size: i64,

    /// Requests between periodic updates
    #[arg(long, env = "CHECK_INTERVAL", default_value = "50")]
    check_interval: u64,

    /// RAM tier capacity in bytes
    #[arg(long, env = "RAM_CAPACITY_BYTES", default_value = "1048576")]
    ram_capacity_bytes: u64,

    /// SSD tier capacity in bytes
    #[arg(long, env = "SSD_CAPACITY_BYTES", default_value = "104857600")]
    ssd_capacity_bytes: u64,

    /// Fraction of capacity above which a tier takes no promotions
    #[arg(long, env = "CAPACITY_THRESHOLD", default_value = "0.9")]
    capacity_threshold: f64,

    /// Operations a cold RAM block must stay idle before demotion
    #[arg(long, env = "DEMOTION_IDLE_OPS", default_value = "50")]
    demotion_idle_ops: u64,

    /// Executor poll interval in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "10")]
    poll_interval_ms: u64,

    /// Fixed per-migration overhead in microseconds
    #[arg(long, env = "TRANSFER_OVERHEAD_US", default_value = "0")]
    transfer_overhead_us: u64,

    /// Simulated transfer bandwidth in MB/s (0 disables the size term)
    #[arg(long, env = "TRANSFER_BANDWIDTH_MBPS", default_value = "0")]
    transfer_bandwidth_mbps: f64,

    /// Seconds to let the executor drain the queue before shutdown
    #[arg(long, env = "DRAIN_TIMEOUT_SECONDS", default_value = "2")]
    drain_timeout_seconds: u64,

    /// Print the final report as JSON
    #[arg(long, env = "REPORT_JSON")]
    report_json: bool,

    /// Print Prometheus metrics after the report
    #[arg(long, env = "DUMP_METRICS")]
    dump_metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn transfer_cost(&self) -> TransferCost {
        let overhead = Duration::from_micros(self.transfer_overhead_us);
        if self.transfer_bandwidth_mbps > 0.0 {
            TransferCost::Bandwidth {
                overhead,
                bytes_per_sec: self.transfer_bandwidth_mbps * 1_000_000.0,
            }
        } else if overhead.is_zero() {
            TransferCost::Instant
        } else {
            TransferCost::Fixed(overhead)
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            selector: SelectorConfig {
                capacity_threshold: self.capacity_threshold,
                demotion_idle_ops: self.demotion_idle_ops,
                capacities: TierCapacities {
                    ram_bytes: self.ram_capacity_bytes,
                    ssd_bytes: self.ssd_capacity_bytes,
                },
                ..Default::default()
            },
            executor: ExecutorConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                transfer_cost: self.transfer_cost(),
                ..Default::default()
            },
        }
    }

    fn workload_config(&self) -> WorkloadConfig {
        WorkloadConfig {
            hot_lbas: self.hot_lbas,
            hot_accesses: self.hot_accesses,
            neutral_lbas: self.neutral_lbas,
            neutral_accesses_each: self.neutral_accesses,
            cold_lbas: self.cold_lbas,
            block_size: self.block_size,
            ..Default::default()
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let workload = SyntheticWorkload::new(args.workload_config());
    let config = args.engine_config();

    info!("Starting LBA migrator");
    info!(
        "  Workload: {} requests over {} LBAs",
        workload.config().total_requests(),
        workload.config().distinct_lbas()
    );
    info!("  Check interval: {} requests", args.check_interval);
    info!(
        "  Capacities: RAM {} bytes, SSD {} bytes",
        args.ram_capacity_bytes, args.ssd_capacity_bytes
    );
    info!("  Transfer cost: {:?}", config.executor.transfer_cost);

    let engine = MigrationEngine::new(config)?;
    engine.start();

    let mut host = SimulationHost::new(engine.clone(), args.check_interval);
    host.run(&workload.requests()).await;

    let drain_timeout = Duration::from_secs(args.drain_timeout_seconds);
    if !engine.wait_idle(drain_timeout).await {
        warn!(
            "Queue not drained after {:?}, {} migrations still pending",
            drain_timeout,
            engine.queue_len()
        );
    }

    let stats = engine.shutdown().await;

    if args.report_json {
        println!("{}", stats.to_json()?);
    } else {
        println!("{}", stats);
    }

    if args.dump_metrics {
        println!("{}", engine.metrics().encode()?);
    }

    info!("LBA migrator finished");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
