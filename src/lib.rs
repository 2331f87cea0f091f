//! LBA Migrator - access-driven block tiering
//!
//! Tracks per-block (LBA) access frequency and moves blocks between a fast,
//! a middle and a slow storage tier (RAM / SSD / HDD). Hot blocks are
//! promoted, cold blocks are demoted off RAM, and a reward signal summarises
//! how well migration throughput tracks request latency.
//!
//! # Architecture
//!
//! The engine splits the work between the request path and a background
//! executor:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          MigrationEngine                            │
//! ├────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐            │
//! │  │   Access     │──▶│  Candidate   │──▶│  Migration   │──┐         │
//! │  │   Tracker    │   │  Selector    │   │  Queue (10)  │  │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘  │         │
//! │         ▲                                                 ▼         │
//! │  record_access        ┌──────────────┐   ┌──────────────────┐      │
//! │                       │   Reward     │   │    Migration     │      │
//! │                       │   Engine     │   │ Executor (task)  │      │
//! │                       └──────────────┘   └──────────────────┘      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Transfer backend and event publisher implementations
//! - [`domain`] - Tiers, LBA ids, events and port traits
//! - [`error`] - Error types
//! - [`host`] - Request-serving host, periodic trigger, synthetic workload
//! - [`metrics`] - Prometheus metrics
//! - [`migrator`] - Tracking, selection, queueing, execution and reward

pub mod adapters;
pub mod domain;
pub mod error;
pub mod host;
pub mod metrics;
pub mod migrator;

// Re-export commonly used types
pub use domain::{LbaId, Tier, TierCapacities, TierUsage};
pub use error::{Error, Result};
pub use host::{PeriodicTrigger, SimulationHost, SyntheticWorkload, CHECK_INTERVAL};
pub use migrator::{EngineConfig, MigrationEngine, MigrationStatistics, UpdateResult};
