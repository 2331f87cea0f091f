//! Simulated Transfer Adapter
//!
//! Implements the `TransferBackend` port by sleeping for the modelled cost of
//! the move. No bytes are copied; tier byte accounting belongs to the host.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::trace;

use crate::domain::ports::{TransferBackend, TransferRequest};
use crate::error::{Error, Result};

/// Cost model for a single migration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferCost {
    /// Moves complete immediately
    Instant,
    /// Every move takes the same time
    Fixed(Duration),
    /// Fixed overhead plus size-proportional time
    Bandwidth {
        overhead: Duration,
        bytes_per_sec: f64,
    },
}

impl Default for TransferCost {
    fn default() -> Self {
        TransferCost::Instant
    }
}

impl TransferCost {
    /// Estimate the time to move `bytes`.
    pub fn estimate(&self, bytes: u64) -> Duration {
        match *self {
            TransferCost::Instant => Duration::ZERO,
            TransferCost::Fixed(d) => d,
            TransferCost::Bandwidth {
                overhead,
                bytes_per_sec,
            } => {
                if bytes_per_sec.is_nan() || bytes_per_sec <= 0.0 {
                    return overhead;
                }
                // Unrepresentable durations fall back to the overhead alone
                Duration::try_from_secs_f64(bytes as f64 / bytes_per_sec)
                    .map_or(overhead, |d| overhead.saturating_add(d))
            }
        }
    }

    /// Reject cost models that cannot produce a meaningful duration.
    pub fn validate(&self) -> Result<()> {
        if let TransferCost::Bandwidth { bytes_per_sec, .. } = *self {
            if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
                return Err(Error::Config(format!(
                    "transfer bandwidth must be finite and positive, got {} bytes/s",
                    bytes_per_sec
                )));
            }
        }
        Ok(())
    }
}

/// Transfer backend that only models elapsed time.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransfer {
    cost: TransferCost,
}

impl SimulatedTransfer {
    pub fn new(cost: TransferCost) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> TransferCost {
        self.cost
    }
}

#[async_trait]
impl TransferBackend for SimulatedTransfer {
    async fn transfer(&self, request: &TransferRequest) -> Result<Duration> {
        let started = Instant::now();
        let delay = self.cost.estimate(request.size_bytes);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        trace!(
            lba = %request.lba,
            from = %request.from_tier,
            to = %request.to_tier,
            ?delay,
            "Simulated transfer finished"
        );
        Ok(started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{LbaId, Tier};
    use uuid::Uuid;

    #[test]
    fn test_cost_estimates() {
        assert_eq!(TransferCost::Instant.estimate(1 << 20), Duration::ZERO);
        assert_eq!(
            TransferCost::Fixed(Duration::from_millis(3)).estimate(1),
            Duration::from_millis(3)
        );

        let bw = TransferCost::Bandwidth {
            overhead: Duration::from_millis(1),
            bytes_per_sec: 1000.0,
        };
        assert_eq!(bw.estimate(500), Duration::from_millis(501));

        let broken = TransferCost::Bandwidth {
            overhead: Duration::from_millis(2),
            bytes_per_sec: 0.0,
        };
        assert_eq!(broken.estimate(500), Duration::from_millis(2));
    }

    #[test]
    fn test_tiny_bandwidth_does_not_overflow() {
        let crawl = TransferCost::Bandwidth {
            overhead: Duration::from_millis(4),
            bytes_per_sec: 1e-300,
        };
        assert_eq!(crawl.estimate(4096), Duration::from_millis(4));

        let nan = TransferCost::Bandwidth {
            overhead: Duration::from_millis(4),
            bytes_per_sec: f64::NAN,
        };
        assert_eq!(nan.estimate(4096), Duration::from_millis(4));
    }

    #[test]
    fn test_validate_bandwidth() {
        let ok = TransferCost::Bandwidth {
            overhead: Duration::ZERO,
            bytes_per_sec: 550e6,
        };
        assert!(ok.validate().is_ok());
        assert!(TransferCost::Fixed(Duration::from_millis(1)).validate().is_ok());

        for bytes_per_sec in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let bad = TransferCost::Bandwidth {
                overhead: Duration::ZERO,
                bytes_per_sec,
            };
            assert!(matches!(bad.validate(), Err(Error::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_simulated_transfer_waits_for_cost() {
        let backend = SimulatedTransfer::new(TransferCost::Fixed(Duration::from_millis(5)));
        let request = TransferRequest {
            migration_id: Uuid::new_v4(),
            lba: LbaId(1),
            from_tier: Tier::Ssd,
            to_tier: Tier::Ram,
            size_bytes: 4096,
        };

        let elapsed = backend.transfer(&request).await.unwrap();
        assert!(elapsed >= Duration::from_millis(5));
    }
}
