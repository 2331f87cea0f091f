//! Candidate Selector
//!
//! Turns tracker state and current tier usage into a bounded, prioritized
//! list of migration proposals. Read-only: it never touches the tracker or
//! the queue.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use tracing::trace;

use super::tracker::{AccessTracker, LbaState};
use crate::domain::ports::{LbaId, Tier, TierCapacities, TierUsage};

/// Default cap on candidates proposed per cycle.
pub const MAX_NEW_CANDIDATES: usize = 10;

/// Why a block should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationReason {
    /// Hot block off the fast tier
    HotNeedsPromotion,
    /// Cold block occupying the fast tier
    ColdNeedsDemotion,
}

impl std::fmt::Display for MigrationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationReason::HotNeedsPromotion => write!(f, "promotion"),
            MigrationReason::ColdNeedsDemotion => write!(f, "demotion"),
        }
    }
}

/// Immutable migration proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationCandidate {
    pub lba: LbaId,
    pub from_tier: Tier,
    pub to_tier: Tier,
    pub reason: MigrationReason,
    /// Higher = more urgent
    pub priority_score: f64,
}

/// Selector configuration
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Maximum candidates returned per cycle
    pub max_candidates: usize,

    /// Fraction of a tier's capacity at which it stops accepting promotions
    pub capacity_threshold: f64,

    /// Operations a cold block must sit untouched before it is demoted
    pub demotion_idle_ops: u64,

    /// Capacity of the bounded tiers
    pub capacities: TierCapacities,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_candidates: MAX_NEW_CANDIDATES,
            capacity_threshold: 0.9,
            demotion_idle_ops: 50,
            capacities: TierCapacities::default(),
        }
    }
}

/// Proposes promotions and demotions from tracker state.
#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    config: SelectorConfig,
}

impl CandidateSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select at most `max_candidates` proposals, most urgent first.
    ///
    /// LBAs in `in_flight` are excluded. `now` is the current operation
    /// count, used to measure idleness.
    pub fn select(
        &self,
        tracker: &AccessTracker,
        in_flight: &HashSet<LbaId>,
        usage: &TierUsage,
        now: u64,
    ) -> Vec<MigrationCandidate> {
        let mut candidates: Vec<MigrationCandidate> = tracker
            .iter()
            .filter(|state| !in_flight.contains(&state.id))
            .filter_map(|state| self.evaluate(state, usage, now))
            .collect();

        candidates.sort_by(|a, b| {
            b.priority_score
                .partial_cmp(&a.priority_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.lba.cmp(&b.lba))
        });
        candidates.truncate(self.config.max_candidates);
        candidates
    }

    fn evaluate(&self, state: &LbaState, usage: &TierUsage, now: u64) -> Option<MigrationCandidate> {
        if state.is_hot() && !state.current_tier.is_fastest() {
            let Some(to_tier) = self.promotion_target(state.current_tier, usage) else {
                trace!(lba = %state.id, tier = %state.current_tier, "No faster tier has room");
                return None;
            };
            return Some(MigrationCandidate {
                lba: state.id,
                from_tier: state.current_tier,
                to_tier,
                reason: MigrationReason::HotNeedsPromotion,
                priority_score: state.access_count as f64,
            });
        }

        if state.is_cold()
            && state.current_tier.is_fastest()
            && state.idle_ops(now) >= self.config.demotion_idle_ops
        {
            let to_tier = state.current_tier.slower()?;
            let since_hot = state.ops_since_hot(now) as f64;
            return Some(MigrationCandidate {
                lba: state.id,
                from_tier: state.current_tier,
                to_tier,
                reason: MigrationReason::ColdNeedsDemotion,
                // In [0, 1): always below any promotion.
                priority_score: since_hot / (since_hot + 1.0),
            });
        }

        None
    }

    /// Nearest faster tier still below the capacity threshold.
    fn promotion_target(&self, current: Tier, usage: &TierUsage) -> Option<Tier> {
        current.faster_tiers().find(|tier| {
            usage.below_threshold(*tier, &self.config.capacities, self.config.capacity_threshold)
        })
    }
}
