//! Error types for the LBA migration engine

use thiserror::Error;

use crate::domain::ports::{LbaId, Tier};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the migration engine
#[derive(Error, Debug)]
pub enum Error {
    /// Destination tier cannot hold the block
    #[error("Tier {tier} has no capacity: need {required} bytes, {available} available")]
    TierFull {
        tier: Tier,
        required: u64,
        available: u64,
    },

    /// Migration references an LBA the tracker has never seen
    #[error("Unknown LBA: {0}")]
    UnknownLba(LbaId),

    /// The block moved since the migration was proposed
    #[error("Stale migration for LBA {lba}: expected on {expected}, found on {actual}")]
    StaleMigration {
        lba: LbaId,
        expected: Tier,
        actual: Tier,
    },

    /// The transfer backend failed to move the block
    #[error("Transfer failed for LBA {lba}: {reason}")]
    Transfer { lba: LbaId, reason: String },

    /// Tier name could not be parsed
    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
