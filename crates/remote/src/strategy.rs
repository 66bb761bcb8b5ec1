//! Latency and outcome strategies for the simulated backend.
//!
//! The simulator asks its [`SimulationStrategy`] for an [`AttemptPlan`]
//! once per call. [`RandomStrategy`] models the unreliable backend;
//! [`ScriptedStrategy`] replays a fixed sequence for deterministic runs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;

/// Default lower bound of the simulated latency (inclusive).
pub const DEFAULT_MIN_LATENCY: Duration = Duration::from_millis(1000);

/// Default upper bound of the simulated latency (exclusive).
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_millis(2000);

/// Default probability that an attempt fails with `ModelOverloaded`.
pub const DEFAULT_FAILURE_RATE: f64 = 0.2;

/// How a planned attempt ends once its latency has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedOutcome {
    Succeed,
    Overloaded,
    /// Fail with an arbitrary error message.
    Fail(String),
}

/// Latency and outcome of one simulated call.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptPlan {
    pub latency: Duration,
    pub outcome: PlannedOutcome,
}

impl AttemptPlan {
    pub fn succeed(latency: Duration) -> Self {
        Self {
            latency,
            outcome: PlannedOutcome::Succeed,
        }
    }

    pub fn overloaded(latency: Duration) -> Self {
        Self {
            latency,
            outcome: PlannedOutcome::Overloaded,
        }
    }

    pub fn fail(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            latency,
            outcome: PlannedOutcome::Fail(message.into()),
        }
    }
}

/// Source of per-call plans.
pub trait SimulationStrategy: Send + Sync {
    fn plan(&self) -> AttemptPlan;
}

// ---------------------------------------------------------------------------
// RandomStrategy
// ---------------------------------------------------------------------------

/// Uniform latency in `[min_latency, max_latency)` and independent
/// per-attempt failures with probability `failure_rate`.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub failure_rate: f64,
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self {
            min_latency: DEFAULT_MIN_LATENCY,
            max_latency: DEFAULT_MAX_LATENCY,
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

impl SimulationStrategy for RandomStrategy {
    fn plan(&self) -> AttemptPlan {
        let mut rng = rand::rng();

        let min_ms = self.min_latency.as_millis() as u64;
        let max_ms = self.max_latency.as_millis() as u64;
        let latency_ms = if max_ms > min_ms {
            rng.random_range(min_ms..max_ms)
        } else {
            min_ms
        };

        let overloaded = rng.random_bool(self.failure_rate.clamp(0.0, 1.0));

        AttemptPlan {
            latency: Duration::from_millis(latency_ms),
            outcome: if overloaded {
                PlannedOutcome::Overloaded
            } else {
                PlannedOutcome::Succeed
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedStrategy
// ---------------------------------------------------------------------------

/// Replays queued plans in order, then repeats `fallback` forever.
#[derive(Debug)]
pub struct ScriptedStrategy {
    queue: Mutex<VecDeque<AttemptPlan>>,
    fallback: AttemptPlan,
}

impl ScriptedStrategy {
    pub fn new(plans: impl IntoIterator<Item = AttemptPlan>, fallback: AttemptPlan) -> Self {
        Self {
            queue: Mutex::new(plans.into_iter().collect()),
            fallback,
        }
    }

    /// Every call follows `plan`.
    pub fn always(plan: AttemptPlan) -> Self {
        Self::new([], plan)
    }
}

impl SimulationStrategy for ScriptedStrategy {
    fn plan(&self) -> AttemptPlan {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
