//! The generation request lifecycle.
//!
//! [`GenerationController`] validates a request, drives up to
//! `max_attempts` calls against its [`GenerationBackend`] with exponential
//! backoff in between, and commits a success to the history. One
//! invocation runs at a time; each gets a fresh [`CancellationToken`]
//! that [`abort`](GenerationController::abort) signals.
//!
//! ```text
//! Idle -> Validating -> Attempting(1) -> Backoff -> Attempting(2) -> ...
//!                   \                 \-> Succeeded
//!                    \-> Failed        \-> Cancelled | Failed
//! ```
//!
//! `Validating` is transient: validation and the slot claim happen in one
//! synchronous step, so status subscribers observe either `Failed` or
//! `Attempting(1)` right after `Idle` (or the previous terminal phase).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use studio_core::generation::{GenerationRequest, GenerationResult};
use studio_events::{EventBus, StudioEvent};
use studio_remote::GenerationBackend;
use studio_store::HistoryStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::retry::{RetryPolicy, RetryState};
use crate::status::GenerationStatus;

/// Lifecycle event names published on the [`EventBus`].
pub mod events {
    pub const STARTED: &str = "generation.started";
    pub const ATTEMPT_FAILED: &str = "generation.attempt_failed";
    pub const SUCCEEDED: &str = "generation.succeeded";
    pub const CANCELLED: &str = "generation.cancelled";
    pub const FAILED: &str = "generation.failed";
}

struct ActiveInvocation {
    id: u64,
    token: CancellationToken,
}

type ActiveSlot = Arc<Mutex<Option<ActiveInvocation>>>;

fn lock(slot: &ActiveSlot) -> MutexGuard<'_, Option<ActiveInvocation>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the controller's single invocation slot. Clears it on drop, so
/// the slot is released on every exit path, including a dropped task.
struct SlotGuard {
    slot: ActiveSlot,
    id: u64,
    token: CancellationToken,
}

impl SlotGuard {
    /// Publish the terminal status and free the slot in one critical
    /// section, so a newly claimed invocation can never be overwritten.
    fn release(self, publish: impl FnOnce()) {
        let mut active = lock(&self.slot);
        publish();
        if active.as_ref().is_some_and(|a| a.id == self.id) {
            *active = None;
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut active = lock(&self.slot);
        if active.as_ref().is_some_and(|a| a.id == self.id) {
            *active = None;
        }
    }
}

/// Orchestrates generation invocations.
pub struct GenerationController<B> {
    backend: Arc<B>,
    history: Arc<HistoryStore>,
    bus: Arc<EventBus>,
    policy: RetryPolicy,
    active: ActiveSlot,
    next_id: AtomicU64,
    status: watch::Sender<GenerationStatus>,
}

impl<B: GenerationBackend> GenerationController<B> {
    pub fn new(
        backend: Arc<B>,
        history: Arc<HistoryStore>,
        bus: Arc<EventBus>,
        policy: RetryPolicy,
    ) -> Self {
        let policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        let (status, _) = watch::channel(GenerationStatus::idle(policy.max_attempts));
        Self {
            backend,
            history,
            bus,
            policy,
            active: Arc::default(),
            next_id: AtomicU64::new(0),
            status,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn status(&self) -> GenerationStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<GenerationStatus> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Run one invocation to completion.
    ///
    /// Rejected with [`GenerationError::AlreadyRunning`] while another
    /// invocation is active; the active one is left untouched.
    pub async fn start(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let guard = self.begin(&request)?;
        self.run(guard, request).await
    }

    /// Signal the active invocation to stop.
    ///
    /// Returns `true` when a token was signalled; `false` when nothing is
    /// running or the invocation was already aborted.
    pub fn abort(&self) -> bool {
        let active = lock(&self.active);
        match active.as_ref() {
            Some(invocation) if !invocation.token.is_cancelled() => {
                tracing::info!(invocation = invocation.id, "Aborting generation");
                invocation.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// The request that reproduces history entry `id`, if it exists.
    pub fn restore(&self, id: &str) -> Option<GenerationRequest> {
        let request = self.history.find(id).map(|entry| entry.to_request());
        if request.is_none() {
            tracing::debug!(id = %id, "Restore requested for unknown history entry");
        }
        request
    }

    /// Validate the request and claim the invocation slot.
    fn begin(&self, request: &GenerationRequest) -> Result<SlotGuard, GenerationError> {
        let max_attempts = self.policy.max_attempts;
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(GenerationError::AlreadyRunning);
        }

        self.set_status(GenerationStatus::validating(max_attempts));
        if let Err(e) = request.ensure_ready() {
            let err = GenerationError::from(e);
            tracing::info!(error = %err, "Generation request rejected");
            self.set_status(GenerationStatus::failed(0, max_attempts, err.to_string()));
            self.bus.publish(
                StudioEvent::new(events::FAILED).with_payload(json!({
                    "attempts": 0,
                    "error": err.to_string(),
                })),
            );
            return Err(err);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *active = Some(ActiveInvocation {
            id,
            token: token.clone(),
        });
        self.set_status(GenerationStatus::attempting(1, max_attempts));

        Ok(SlotGuard {
            slot: Arc::clone(&self.active),
            id,
            token,
        })
    }

    async fn run(
        &self,
        guard: SlotGuard,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let max_attempts = self.policy.max_attempts;
        let invocation = guard.id;
        let token = guard.token.clone();
        let mut retry = RetryState::new(max_attempts);

        tracing::info!(
            invocation,
            style = %request.style,
            max_attempts,
            "Generation started",
        );
        self.bus.publish(StudioEvent::new(events::STARTED).with_payload(json!({
            "invocation": invocation,
            "prompt": request.prompt,
            "style": request.style,
        })));

        let outcome = loop {
            let attempt = retry.current_attempt();
            self.set_status(GenerationStatus::attempting(attempt, max_attempts));
            tracing::debug!(invocation, attempt, "Generation attempt started");

            match self.backend.invoke(&request, &token).await {
                Ok(result) => {
                    self.history.record(result.clone());
                    retry.reset();
                    break Ok((attempt, result));
                }
                Err(e) if !e.is_retryable() => {
                    break Err((attempt, GenerationError::Cancelled));
                }
                Err(e) => {
                    retry.record_failure(e.to_string());
                    tracing::warn!(invocation, attempt, error = %e, "Generation attempt failed");
                    self.bus.publish(
                        StudioEvent::new(events::ATTEMPT_FAILED).with_payload(json!({
                            "invocation": invocation,
                            "attempt": attempt,
                            "error": e.to_string(),
                        })),
                    );

                    if retry.is_exhausted() {
                        break Err((
                            attempt,
                            GenerationError::Exhausted {
                                attempts: retry.attempt,
                                last_error: e.to_string(),
                            },
                        ));
                    }

                    let delay = self.policy.delay_after(retry.attempt);
                    self.set_status(GenerationStatus::backoff(
                        retry.attempt,
                        max_attempts,
                        delay,
                        &e.to_string(),
                    ));
                    tracing::info!(
                        invocation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying generation after backoff",
                    );

                    if !self.wait_backoff(delay, &token).await {
                        break Err((attempt, GenerationError::Cancelled));
                    }
                }
            }
        };

        let (status, event, result) = match outcome {
            Ok((attempt, result)) => {
                tracing::info!(invocation, attempt, id = %result.id, "Generation succeeded");
                (
                    GenerationStatus::succeeded(attempt, max_attempts, result.clone()),
                    StudioEvent::new(events::SUCCEEDED)
                        .with_subject(result.id.clone())
                        .with_payload(json!({ "invocation": invocation, "attempt": attempt })),
                    Ok(result),
                )
            }
            Err((attempt, GenerationError::Cancelled)) => {
                tracing::info!(invocation, attempt, "Generation cancelled");
                let err = GenerationError::Cancelled;
                (
                    GenerationStatus::cancelled(attempt, max_attempts, err.to_string()),
                    StudioEvent::new(events::CANCELLED)
                        .with_payload(json!({ "invocation": invocation, "attempt": attempt })),
                    Err(err),
                )
            }
            Err((attempt, err)) => {
                tracing::warn!(invocation, attempt, error = %err, "Generation failed");
                (
                    GenerationStatus::failed(attempt, max_attempts, err.to_string()),
                    StudioEvent::new(events::FAILED).with_payload(json!({
                        "invocation": invocation,
                        "attempts": attempt,
                        "error": err.to_string(),
                    })),
                    Err(err),
                )
            }
        };

        guard.release(|| self.set_status(status));
        self.bus.publish(event);
        result
    }

    /// Wait out a backoff delay. Returns `false` when the wait was cut
    /// short by cancellation.
    async fn wait_backoff(&self, delay: Duration, token: &CancellationToken) -> bool {
        if !self.policy.interruptible_backoff {
            tokio::time::sleep(delay).await;
            return true;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn set_status(&self, status: GenerationStatus) {
        self.status.send_replace(status);
    }
}

impl<B: GenerationBackend + 'static> GenerationController<B> {
    /// Validate and claim synchronously, then run the invocation on a
    /// background task.
    ///
    /// Validation and `AlreadyRunning` rejections are returned directly.
    pub fn spawn(
        self: &Arc<Self>,
        request: GenerationRequest,
    ) -> Result<JoinHandle<Result<GenerationResult, GenerationError>>, GenerationError> {
        let guard = self.begin(&request)?;
        let controller = Arc::clone(self);
        Ok(tokio::spawn(
            async move { controller.run(guard, request).await },
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
