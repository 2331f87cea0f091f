//! Migrator module
//!
//! Decides which LBAs move between tiers and moves them in the background.

mod counters;
mod engine;
mod executor;
mod queue;
mod report;
mod reward;
mod selector;
mod tracker;

#[cfg(test)]
mod proptest;

pub use counters::Counters;
pub use engine::{EngineConfig, MigrationEngine, UpdateResult};
pub use executor::{ExecutorConfig, MigrationExecutor};
pub use queue::{Admission, MigrationQueue, MigrationStatus, QueuedMigration, QUEUE_CAPACITY};
pub use report::MigrationStatistics;
pub use reward::{compute_reward, RewardEngine, RewardEvaluation, REWARD_EPSILON};
pub use selector::{
    CandidateSelector, MigrationCandidate, MigrationReason, SelectorConfig, MAX_NEW_CANDIDATES,
};
pub use tracker::{
    classify, AccessRecord, AccessTracker, LbaState, COLD_THRESHOLD, HOT_THRESHOLD,
};
