//! Domain Layer
//!
//! Value objects, events and the port traits the migration engine depends on.
//!
//! - **Ports** (`ports.rs`) - Tiers, LBA ids, capacity figures and the
//!   `TransferBackend` / `EventPublisher` traits
//! - **Events** (`events.rs`) - Migration lifecycle events

pub mod events;
pub mod ports;

pub use events::MigrationEvent;
pub use ports::{
    EventPublisher, LbaId, Tier, TierCapacities, TierClassification, TierUsage, TransferBackend,
    TransferRequest,
};
