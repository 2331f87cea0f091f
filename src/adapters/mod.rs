//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! # Usage
//!
//! ```ignore
//! use lba_migrator::adapters::{LoggingEventPublisher, SimulatedTransfer, TransferCost};
//!
//! let transfer = SimulatedTransfer::new(TransferCost::Fixed(Duration::from_millis(2)));
//! let events = LoggingEventPublisher::info_level();
//! ```

mod event_publisher;
mod transfer;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use transfer::{SimulatedTransfer, TransferCost};
