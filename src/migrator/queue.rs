//! Migration Queue
//!
//! Bounded FIFO of admitted migration proposals. All prioritization happens
//! in the selector; the queue only preserves admission order.
//!
//! The queue is not internally synchronized. It lives inside the engine's
//! shared state and every call happens under that single lock, which is what
//! makes admission and dequeue atomic with respect to each other.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::selector::MigrationCandidate;
use crate::domain::ports::LbaId;

/// Maximum number of queued migrations.
pub const QUEUE_CAPACITY: usize = 10;

/// Lifecycle of a queued migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl MigrationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationStatus::Completed | MigrationStatus::Failed)
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStatus::Queued => write!(f, "Queued"),
            MigrationStatus::InProgress => write!(f, "InProgress"),
            MigrationStatus::Completed => write!(f, "Completed"),
            MigrationStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// An admitted candidate and its execution status.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedMigration {
    pub id: Uuid,
    pub candidate: MigrationCandidate,
    pub status: MigrationStatus,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedMigration {
    fn new(candidate: MigrationCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate,
            status: MigrationStatus::Queued,
            enqueued_at: Utc::now(),
        }
    }

    pub fn lba(&self) -> LbaId {
        self.candidate.lba
    }
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Queue is at capacity
    QueueFull,
    /// The LBA already has a queued or in-progress migration
    AlreadyInFlight,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        *self == Admission::Admitted
    }
}

/// Bounded FIFO of pending migrations.
#[derive(Debug)]
pub struct MigrationQueue {
    entries: VecDeque<QueuedMigration>,
    /// LBAs with a queued or in-progress migration
    in_flight: HashSet<LbaId>,
    capacity: usize,
}

impl Default for MigrationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(QUEUE_CAPACITY),
            in_flight: HashSet::new(),
            capacity: QUEUE_CAPACITY,
        }
    }

    /// Try to admit a candidate. Never blocks.
    pub fn enqueue(&mut self, candidate: MigrationCandidate) -> Admission {
        if self.is_full() {
            return Admission::QueueFull;
        }
        if self.in_flight.contains(&candidate.lba) {
            return Admission::AlreadyInFlight;
        }
        self.in_flight.insert(candidate.lba);
        self.entries.push_back(QueuedMigration::new(candidate));
        Admission::Admitted
    }

    /// Remove the oldest entry, marked in-progress.
    ///
    /// The LBA stays in flight until [`finish`](Self::finish) is called.
    pub fn dequeue_next(&mut self) -> Option<QueuedMigration> {
        let mut migration = self.entries.pop_front()?;
        migration.status = MigrationStatus::InProgress;
        Some(migration)
    }

    /// Release the LBA of a migration that reached a terminal status.
    pub fn finish(&mut self, lba: LbaId) {
        self.in_flight.remove(&lba);
    }

    pub fn is_in_flight(&self, lba: LbaId) -> bool {
        self.in_flight.contains(&lba)
    }

    pub fn in_flight(&self) -> &HashSet<LbaId> {
        &self.in_flight
    }

    /// Entries still waiting, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &QueuedMigration> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
