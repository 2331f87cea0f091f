//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the value objects the migration engine works with and
//! the traits (ports) through which it reaches its collaborators. Adapters in
//! [`crate::adapters`] provide the concrete implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │        TransferBackend   │   EventPublisher          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  SimulatedTransfer │ LoggingEventPublisher │ ...     │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::MigrationEvent;
use crate::error::{Error, Result};

// =============================================================================
// Value Objects
// =============================================================================

/// Logical block address identifier (value object).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LbaId(pub u64);

impl std::fmt::Display for LbaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LbaId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Storage tier, ordered fastest to slowest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Ram,
    Ssd,
    Hdd,
}

impl Tier {
    /// All tiers, fastest first.
    pub const ALL: [Tier; 3] = [Tier::Ram, Tier::Ssd, Tier::Hdd];

    /// The fast tier that promotions aim for.
    pub const FASTEST: Tier = Tier::Ram;

    /// Position in the hierarchy (0 = fastest).
    pub fn rank(&self) -> usize {
        match self {
            Tier::Ram => 0,
            Tier::Ssd => 1,
            Tier::Hdd => 2,
        }
    }

    /// The next faster tier, if any.
    pub fn faster(&self) -> Option<Tier> {
        match self {
            Tier::Ram => None,
            Tier::Ssd => Some(Tier::Ram),
            Tier::Hdd => Some(Tier::Ssd),
        }
    }

    /// The next slower tier, if any.
    pub fn slower(&self) -> Option<Tier> {
        match self {
            Tier::Ram => Some(Tier::Ssd),
            Tier::Ssd => Some(Tier::Hdd),
            Tier::Hdd => None,
        }
    }

    /// Tiers faster than this one, nearest first.
    pub fn faster_tiers(&self) -> impl Iterator<Item = Tier> {
        std::iter::successors(self.faster(), |t| t.faster())
    }

    pub fn is_fastest(&self) -> bool {
        *self == Self::FASTEST
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Ram => write!(f, "RAM"),
            Tier::Ssd => write!(f, "SSD"),
            Tier::Hdd => write!(f, "HDD"),
        }
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RAM" => Ok(Tier::Ram),
            "SSD" => Ok(Tier::Ssd),
            "HDD" => Ok(Tier::Hdd),
            _ => Err(Error::InvalidTier(s.to_string())),
        }
    }
}

/// Hotness classification derived from an access count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierClassification {
    Hot,
    Neutral,
    Cold,
}

impl std::fmt::Display for TierClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierClassification::Hot => write!(f, "hot"),
            TierClassification::Neutral => write!(f, "neutral"),
            TierClassification::Cold => write!(f, "cold"),
        }
    }
}

/// Byte capacity of the bounded tiers. HDD is treated as unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCapacities {
    pub ram_bytes: u64,
    pub ssd_bytes: u64,
}

impl Default for TierCapacities {
    fn default() -> Self {
        Self {
            ram_bytes: 1024 * 1024,       // 1MB
            ssd_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl TierCapacities {
    /// Capacity of a tier, `None` when unbounded.
    pub fn capacity(&self, tier: Tier) -> Option<u64> {
        match tier {
            Tier::Ram => Some(self.ram_bytes),
            Tier::Ssd => Some(self.ssd_bytes),
            Tier::Hdd => None,
        }
    }
}

/// Host-reported byte usage of the bounded tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierUsage {
    pub ram_bytes: u64,
    pub ssd_bytes: u64,
}

impl TierUsage {
    pub fn new(ssd_bytes: u64, ram_bytes: u64) -> Self {
        Self {
            ram_bytes,
            ssd_bytes,
        }
    }

    /// Usage of a tier. HDD usage is not tracked.
    pub fn used(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Ram => self.ram_bytes,
            Tier::Ssd => self.ssd_bytes,
            Tier::Hdd => 0,
        }
    }

    fn slot(&mut self, tier: Tier) -> Option<&mut u64> {
        match tier {
            Tier::Ram => Some(&mut self.ram_bytes),
            Tier::Ssd => Some(&mut self.ssd_bytes),
            Tier::Hdd => None,
        }
    }

    pub fn add(&mut self, tier: Tier, bytes: u64) {
        if let Some(slot) = self.slot(tier) {
            *slot = slot.saturating_add(bytes);
        }
    }

    pub fn remove(&mut self, tier: Tier, bytes: u64) {
        if let Some(slot) = self.slot(tier) {
            *slot = slot.saturating_sub(bytes);
        }
    }

    /// Whether `tier` is strictly below `threshold` of its capacity.
    pub fn below_threshold(&self, tier: Tier, capacities: &TierCapacities, threshold: f64) -> bool {
        match capacities.capacity(tier) {
            Some(cap) => (self.used(tier) as f64) < cap as f64 * threshold,
            None => true,
        }
    }

    /// Check that `bytes` more fit into `tier`.
    pub fn ensure_room(&self, tier: Tier, bytes: u64, capacities: &TierCapacities) -> Result<()> {
        let Some(cap) = capacities.capacity(tier) else {
            return Ok(());
        };
        let available = cap.saturating_sub(self.used(tier));
        if bytes > available || self.used(tier) >= cap {
            return Err(Error::TierFull {
                tier,
                required: bytes,
                available,
            });
        }
        Ok(())
    }
}

/// A single block move handed to the transfer backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub migration_id: Uuid,
    pub lba: LbaId,
    pub from_tier: Tier,
    pub to_tier: Tier,
    pub size_bytes: u64,
}

// =============================================================================
// Port Traits
// =============================================================================

/// Moves a block between tiers.
///
/// Called by the executor without the engine lock held. Returns the time the
/// transfer took.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    async fn transfer(&self, request: &TransferRequest) -> Result<Duration>;
}

/// Port for publishing migration events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a migration event.
    async fn publish(&self, event: MigrationEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<MigrationEvent>) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
