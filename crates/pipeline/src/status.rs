//! Observable state of the generation controller.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use studio_core::generation::GenerationResult;
use studio_core::types::Timestamp;

/// Lifecycle phase of the current (or last) invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Validating,
    Attempting,
    Backoff,
    Succeeded,
    Cancelled,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

/// Snapshot published after every controller transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub phase: Phase,
    /// 1-based attempt number; 0 before the first attempt.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Failed attempts so far in this invocation. Reset to 0 on success.
    pub retries: u32,
    /// User-facing progress or error text.
    pub message: Option<String>,
    pub backoff_ms: Option<u64>,
    /// The committed result, once `Succeeded`.
    pub result: Option<GenerationResult>,
    pub updated_at: Timestamp,
}

impl GenerationStatus {
    fn new(phase: Phase, max_attempts: u32) -> Self {
        Self {
            phase,
            attempt: 0,
            max_attempts,
            retries: 0,
            message: None,
            backoff_ms: None,
            result: None,
            updated_at: Utc::now(),
        }
    }

    pub fn idle(max_attempts: u32) -> Self {
        Self::new(Phase::Idle, max_attempts)
    }

    pub fn validating(max_attempts: u32) -> Self {
        Self::new(Phase::Validating, max_attempts)
    }

    pub fn attempting(attempt: u32, max_attempts: u32) -> Self {
        let retries = attempt.saturating_sub(1);
        let message = if retries > 0 {
            format!("Generating (Retry {retries}/{max_attempts})")
        } else {
            "Generating".to_string()
        };
        Self {
            attempt,
            retries,
            message: Some(message),
            ..Self::new(Phase::Attempting, max_attempts)
        }
    }

    pub fn backoff(failed: u32, max_attempts: u32, delay: Duration, last_error: &str) -> Self {
        Self {
            attempt: failed,
            retries: failed,
            message: Some(last_error.to_string()),
            backoff_ms: Some(delay.as_millis() as u64),
            ..Self::new(Phase::Backoff, max_attempts)
        }
    }

    pub fn succeeded(attempt: u32, max_attempts: u32, result: GenerationResult) -> Self {
        Self {
            attempt,
            result: Some(result),
            ..Self::new(Phase::Succeeded, max_attempts)
        }
    }

    pub fn cancelled(attempt: u32, max_attempts: u32, message: String) -> Self {
        Self {
            attempt,
            retries: attempt.saturating_sub(1),
            message: Some(message),
            ..Self::new(Phase::Cancelled, max_attempts)
        }
    }

    pub fn failed(attempt: u32, max_attempts: u32, message: String) -> Self {
        Self {
            attempt,
            retries: attempt,
            message: Some(message),
            ..Self::new(Phase::Failed, max_attempts)
        }
    }
}
