//! Reward Engine
//!
//! Computes the delayed migration reward once per periodic update:
//!
//! ```text
//! reward = completed_since_last / max(avg_latency_ns, ε)
//! avg_latency_ns = window_latency / max(window_requests, 1)
//! ```
//!
//! Completions credited to a window may come from candidates admitted in an
//! earlier one, since the executor runs independently of the trigger.
//!
//! The formula divides a count by nanoseconds, so rewards are tiny, or huge
//! when the window saw no I/O. Treat it as a relative signal between runs.

use serde::Serialize;

use super::counters::Counters;

/// Floor for the average latency in the reward denominator.
pub const REWARD_EPSILON: f64 = 1e-9;

/// `completed / max(avg_latency_ns, ε)`
pub fn compute_reward(completed: u64, avg_latency_ns: f64) -> f64 {
    completed as f64 / avg_latency_ns.max(REWARD_EPSILON)
}

/// Result of one reward evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardEvaluation {
    pub reward: f64,
    /// Completions since the previous evaluation
    pub completed_delta: u64,
    pub average_latency_ns: f64,
    /// Requests in the evaluated window
    pub requests: u64,
}

/// Tracks the completion baseline and reward history.
#[derive(Debug, Default)]
pub struct RewardEngine {
    completed_baseline: u64,
    last_reward: f64,
    reward_sum: f64,
    evaluations: u64,
}

impl RewardEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the window that ends now and open the next one.
    pub fn evaluate(&mut self, counters: &mut Counters) -> RewardEvaluation {
        let completed_delta = counters
            .migrations_completed
            .saturating_sub(self.completed_baseline);
        let requests = counters.requests_accumulator;
        let average_latency_ns = counters.latency_accumulator_ns / requests.max(1) as f64;
        let reward = compute_reward(completed_delta, average_latency_ns);

        self.completed_baseline = counters.migrations_completed;
        counters.reset_window();

        self.last_reward = reward;
        self.reward_sum += reward;
        self.evaluations += 1;

        RewardEvaluation {
            reward,
            completed_delta,
            average_latency_ns,
            requests,
        }
    }

    pub fn last_reward(&self) -> f64 {
        self.last_reward
    }

    /// Mean of all evaluated rewards, 0 before the first evaluation.
    pub fn average_reward(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.reward_sum / self.evaluations as f64
        }
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}
