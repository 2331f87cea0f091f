//! Migration Events
//!
//! Immutable records of what the executor did with each queued migration.
//! Events are published through the [`EventPublisher`](super::ports::EventPublisher)
//! port and are used for audit logging and test inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ports::{LbaId, Tier};

/// Event describing the lifecycle of a single migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MigrationEvent {
    /// The executor picked the migration off the queue.
    MigrationStarted {
        migration_id: Uuid,
        lba: LbaId,
        from_tier: Tier,
        to_tier: Tier,
        timestamp: DateTime<Utc>,
    },

    /// The block now resides on the destination tier.
    MigrationCompleted {
        migration_id: Uuid,
        lba: LbaId,
        from_tier: Tier,
        to_tier: Tier,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The move could not be completed and was discarded.
    MigrationFailed {
        migration_id: Uuid,
        lba: LbaId,
        from_tier: Tier,
        to_tier: Tier,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl MigrationEvent {
    /// Name of the event variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            MigrationEvent::MigrationStarted { .. } => "MigrationStarted",
            MigrationEvent::MigrationCompleted { .. } => "MigrationCompleted",
            MigrationEvent::MigrationFailed { .. } => "MigrationFailed",
        }
    }

    /// LBA the event refers to.
    pub fn lba(&self) -> LbaId {
        match self {
            MigrationEvent::MigrationStarted { lba, .. }
            | MigrationEvent::MigrationCompleted { lba, .. }
            | MigrationEvent::MigrationFailed { lba, .. } => *lba,
        }
    }

    pub fn started(migration_id: Uuid, lba: LbaId, from_tier: Tier, to_tier: Tier) -> Self {
        MigrationEvent::MigrationStarted {
            migration_id,
            lba,
            from_tier,
            to_tier,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(
        migration_id: Uuid,
        lba: LbaId,
        from_tier: Tier,
        to_tier: Tier,
        duration_ms: u64,
    ) -> Self {
        MigrationEvent::MigrationCompleted {
            migration_id,
            lba,
            from_tier,
            to_tier,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        migration_id: Uuid,
        lba: LbaId,
        from_tier: Tier,
        to_tier: Tier,
        reason: impl Into<String>,
    ) -> Self {
        MigrationEvent::MigrationFailed {
            migration_id,
            lba,
            from_tier,
            to_tier,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}
