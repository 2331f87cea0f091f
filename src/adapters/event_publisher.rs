//! Event Publisher Adapters
//!
//! `EventPublisher` implementations: one that writes migration events to the
//! tracing system and one that keeps them in memory.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::events::MigrationEvent;
use crate::domain::ports::{EventPublisher, LbaId};
use crate::error::Result;

/// Writes each migration event as a structured log record at info or debug
/// level.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher {
    info_level: bool,
}

impl LoggingEventPublisher {
    /// Debug-level publisher.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info_level() -> Self {
        Self { info_level: true }
    }

    pub fn debug_level() -> Self {
        Self { info_level: false }
    }

    fn log_progress(&self, event: &MigrationEvent, message: &str) {
        let lba = event.lba();
        if self.info_level {
            info!(event_type = event.event_type(), lba = %lba, "{}", message);
        } else {
            debug!(event_type = event.event_type(), lba = %lba, "{}", message);
        }
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: MigrationEvent) -> Result<()> {
        match &event {
            MigrationEvent::MigrationStarted {
                migration_id,
                from_tier,
                to_tier,
                ..
            } => {
                let message = format!(
                    "Migration {} started: {} -> {}",
                    migration_id, from_tier, to_tier
                );
                self.log_progress(&event, &message);
            }
            MigrationEvent::MigrationCompleted {
                from_tier,
                to_tier,
                duration_ms,
                ..
            } => {
                let message = format!(
                    "Migration completed: {} -> {} in {}ms",
                    from_tier, to_tier, duration_ms
                );
                self.log_progress(&event, &message);
            }
            MigrationEvent::MigrationFailed {
                from_tier,
                to_tier,
                reason,
                ..
            } => {
                let message = format!(
                    "Migration failed: {} -> {}: {}",
                    from_tier, to_tier, reason
                );
                self.log_progress(&event, &message);
            }
        }
        Ok(())
    }

    async fn publish_all(&self, events: Vec<MigrationEvent>) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// Keeps every published event for later inspection.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: parking_lot::RwLock<Vec<MigrationEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events, in publication order.
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Events whose variant name is `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<MigrationEvent> {
        self.filtered(|e| e.event_type() == event_type)
    }

    /// Events for one LBA.
    pub fn events_for(&self, lba: LbaId) -> Vec<MigrationEvent> {
        self.filtered(|e| e.lba() == lba)
    }

    fn filtered(&self, keep: impl Fn(&MigrationEvent) -> bool) -> Vec<MigrationEvent> {
        self.events.read().iter().filter(|e| keep(e)).cloned().collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: MigrationEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<MigrationEvent>) -> Result<()> {
        self.events.write().extend(events);
        Ok(())
    }
}
