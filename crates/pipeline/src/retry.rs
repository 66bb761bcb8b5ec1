//! Retry bookkeeping for one generation invocation.

use std::time::Duration;

use studio_core::backoff::{delay_for_attempt, BackoffConfig};

/// Default number of attempts per invocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How an invocation retries failed attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per invocation, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay schedule between failed attempts.
    pub backoff: BackoffConfig,
    /// Whether `abort()` cuts a pending backoff wait short. When `false`
    /// the wait runs to completion and the next attempt observes the
    /// cancelled token instead.
    pub interruptible_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffConfig::default(),
            interruptible_backoff: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Backoff to wait after the `failed`-th failure (1-based).
    pub fn delay_after(&self, failed: u32) -> Duration {
        delay_for_attempt(failed, &self.backoff)
    }
}

/// Failed-attempt counter of the running invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts that have failed so far.
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            last_error: None,
        }
    }

    /// 1-based number of the attempt about to run.
    pub fn current_attempt(&self) -> u32 {
        self.attempt + 1
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.attempt += 1;
        self.last_error = Some(error.into());
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.interruptible_backoff);
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }

    #[test]
    fn zero_max_attempts_is_raised_to_one() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
        assert_eq!(RetryState::new(0).max_attempts, 1);
    }

    #[test]
    fn state_exhausts_after_max_failures() {
        let mut state = RetryState::new(3);
        assert_eq!(state.current_attempt(), 1);

        state.record_failure("Model overloaded");
        state.record_failure("Model overloaded");
        assert!(!state.is_exhausted());
        assert_eq!(state.current_attempt(), 3);

        state.record_failure("boom");
        assert!(state.is_exhausted());
        assert_eq!(state.last_error.as_deref(), Some("boom"));

        state.reset();
        assert_eq!(state.attempt, 0);
        assert!(state.last_error.is_none());
    }
}
