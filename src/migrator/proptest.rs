//! Property-Based Tests for the migration pipeline
//!
//! # Test Properties
//!
//! 1. **Classification**: a pure function of the access count
//! 2. **Queue bound**: any enqueue/dequeue sequence keeps `0 <= len <= 10`
//! 3. **No duplicates**: an LBA is never in flight twice
//! 4. **Counting**: N identical accesses add exactly N to one LBA
//! 5. **Counter ordering**: completed never exceeds enqueued

#![cfg(test)]

use std::collections::HashSet;

use proptest::prelude::*;

use super::counters::Counters;
use super::queue::{MigrationQueue, QUEUE_CAPACITY};
use super::reward::{compute_reward, RewardEngine};
use super::selector::{CandidateSelector, MigrationCandidate, MigrationReason, SelectorConfig};
use super::tracker::{classify, AccessRecord, AccessTracker, COLD_THRESHOLD, HOT_THRESHOLD};
use crate::domain::ports::{LbaId, Tier, TierClassification, TierUsage};

// =============================================================================
// Property Strategies
// =============================================================================

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Ram), Just(Tier::Ssd), Just(Tier::Hdd)]
}

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue(u64),
    Dequeue,
    DequeueAndFinish,
}

fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => (0u64..20).prop_map(QueueOp::Enqueue),
        1 => Just(QueueOp::Dequeue),
        1 => Just(QueueOp::DequeueAndFinish),
    ]
}

fn candidate(lba: u64) -> MigrationCandidate {
    MigrationCandidate {
        lba: LbaId(lba),
        from_tier: Tier::Hdd,
        to_tier: Tier::Ssd,
        reason: MigrationReason::HotNeedsPromotion,
        priority_score: 5.0,
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_classification_is_pure(count in 0u64..10_000) {
        let expected = if count >= HOT_THRESHOLD {
            TierClassification::Hot
        } else if count <= COLD_THRESHOLD {
            TierClassification::Cold
        } else {
            TierClassification::Neutral
        };
        prop_assert_eq!(classify(count), expected);
        prop_assert_eq!(classify(count), classify(count));
    }

    #[test]
    fn prop_queue_length_bounded(ops in prop::collection::vec(queue_op_strategy(), 0..200)) {
        let mut queue = MigrationQueue::new();
        let mut in_progress: Vec<LbaId> = Vec::new();

        for op in ops {
            match op {
                QueueOp::Enqueue(lba) => {
                    queue.enqueue(candidate(lba));
                }
                QueueOp::Dequeue => {
                    if let Some(m) = queue.dequeue_next() {
                        in_progress.push(m.lba());
                    }
                }
                QueueOp::DequeueAndFinish => {
                    if let Some(m) = queue.dequeue_next() {
                        queue.finish(m.lba());
                    }
                }
            }
            prop_assert!(queue.len() <= QUEUE_CAPACITY);

            // Queued LBAs are distinct and disjoint from in-progress ones
            let queued: Vec<LbaId> = queue.pending().map(|m| m.lba()).collect();
            let unique: HashSet<LbaId> = queued.iter().copied().collect();
            prop_assert_eq!(unique.len(), queued.len());
            prop_assert!(in_progress.iter().all(|lba| !unique.contains(lba)));
        }
    }

    #[test]
    fn prop_repeated_access_counts_exactly(lba in 0u64..1000, tier in tier_strategy(), n in 1u64..200) {
        let mut tracker = AccessTracker::new();
        let record = AccessRecord {
            lba: LbaId(lba),
            tier,
            latency_ns: 250.0,
            size_bytes: 512,
            is_read: true,
        };
        let mut registrations = 0;
        for op in 1..=n {
            if tracker.record_access(op, &record) {
                registrations += 1;
            }
        }

        prop_assert_eq!(registrations, 1);
        prop_assert_eq!(tracker.len(), 1);
        prop_assert_eq!(tracker.get(LbaId(lba)).unwrap().access_count, n);
    }

    #[test]
    fn prop_selection_bounded_and_sorted(
        accesses in prop::collection::vec((0u64..50, tier_strategy()), 0..400),
        idle in 0u64..200,
    ) {
        let mut tracker = AccessTracker::new();
        let mut op = 0;
        for (lba, tier) in accesses {
            op += 1;
            tracker.record_access(op, &AccessRecord {
                lba: LbaId(lba),
                tier,
                latency_ns: 1.0,
                size_bytes: 4096,
                is_read: false,
            });
        }

        let selector = CandidateSelector::new(SelectorConfig::default());
        let result = selector.select(&tracker, &HashSet::new(), &TierUsage::default(), op + idle);

        prop_assert!(result.len() <= 10);
        for pair in result.windows(2) {
            prop_assert!(pair[0].priority_score >= pair[1].priority_score);
            if pair[0].priority_score == pair[1].priority_score {
                prop_assert!(pair[0].lba < pair[1].lba);
            }
        }
        for c in &result {
            let state = tracker.get(c.lba).unwrap();
            match c.reason {
                MigrationReason::HotNeedsPromotion => {
                    prop_assert!(state.is_hot());
                    prop_assert!(c.to_tier < c.from_tier);
                }
                MigrationReason::ColdNeedsDemotion => {
                    prop_assert!(state.is_cold());
                    prop_assert_eq!(c.from_tier, Tier::Ram);
                }
            }
        }
    }

    #[test]
    fn prop_completed_never_exceeds_enqueued(
        steps in prop::collection::vec((0u64..5, 0u64..5, any::<bool>()), 0..50),
    ) {
        let mut counters = Counters::default();
        let mut reward = RewardEngine::new();

        for (admit, resolve, evaluate) in steps {
            counters.migrations_enqueued += admit;
            let resolvable = resolve.min(counters.migrations_outstanding());
            counters.migrations_completed += resolvable;
            prop_assert!(counters.migrations_completed <= counters.migrations_enqueued);

            if evaluate {
                let eval = reward.evaluate(&mut counters);
                prop_assert!(eval.reward.is_finite());
                prop_assert!(eval.reward >= 0.0);
            }
        }
    }

    #[test]
    fn prop_reward_monotonic_in_completions(latency in 1.0f64..1e9, a in 0u64..100, b in 0u64..100) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(compute_reward(lo, latency) <= compute_reward(hi, latency));
    }
}
