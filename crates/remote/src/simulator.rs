//! Simulated remote generation service.
//!
//! Each call waits a planned latency and then either echoes the request
//! back as a [`GenerationResult`] or fails. The call races its latency
//! against the cancellation token, so an abort settles it immediately.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use studio_core::generation::{GenerationRequest, GenerationResult};
use tokio_util::sync::CancellationToken;

use crate::backend::GenerationBackend;
use crate::error::RemoteError;
use crate::strategy::{PlannedOutcome, RandomStrategy, SimulationStrategy};

/// Stand-in for the real image-generation service.
pub struct RemoteCallSimulator {
    strategy: Arc<dyn SimulationStrategy>,
    invocations: AtomicU32,
}

impl RemoteCallSimulator {
    pub fn new(strategy: impl SimulationStrategy + 'static) -> Self {
        Self {
            strategy: Arc::new(strategy),
            invocations: AtomicU32::new(0),
        }
    }

    /// Number of calls made so far, including ones that were aborted.
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for RemoteCallSimulator {
    fn default() -> Self {
        Self::new(RandomStrategy::default())
    }
}

impl GenerationBackend for RemoteCallSimulator {
    async fn invoke(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<GenerationResult, RemoteError> {
        let call = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;

        if token.is_cancelled() {
            tracing::debug!(call, "Remote call aborted before start");
            return Err(RemoteError::Aborted);
        }

        let plan = self.strategy.plan();
        tracing::debug!(call, latency_ms = plan.latency.as_millis() as u64, "Remote call started");

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(call, "Remote call aborted");
                return Err(RemoteError::Aborted);
            }
            _ = tokio::time::sleep(plan.latency) => {}
        }

        // An abort that lands together with the timer still wins.
        if token.is_cancelled() {
            return Err(RemoteError::Aborted);
        }

        match plan.outcome {
            PlannedOutcome::Succeed => {
                let result = GenerationResult::from_request(request);
                tracing::debug!(call, id = %result.id, "Remote call succeeded");
                Ok(result)
            }
            PlannedOutcome::Overloaded => {
                tracing::debug!(call, "Remote call failed: model overloaded");
                Err(RemoteError::ModelOverloaded)
            }
            PlannedOutcome::Fail(message) => {
                tracing::debug!(call, error = %message, "Remote call failed");
                Err(RemoteError::Unknown(message))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use studio_core::generation::GENERATION_ID_PREFIX;
    use studio_core::style::Style;
    use tokio::time::Instant;

    use super::*;
    use crate::strategy::{AttemptPlan, ScriptedStrategy};

    fn request() -> GenerationRequest {
        GenerationRequest::new("data:image/png;base64,AAA", "a red hat", Style::Streetwear)
    }

    fn simulator(plan: AttemptPlan) -> RemoteCallSimulator {
        RemoteCallSimulator::new(ScriptedStrategy::always(plan))
    }

    #[tokio::test(start_paused = true)]
    async fn success_echoes_request_after_latency() {
        let sim = simulator(AttemptPlan::succeed(Duration::from_millis(1500)));
        let token = CancellationToken::new();
        let started = Instant::now();

        let result = sim.invoke(&request(), &token).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(started.elapsed() < Duration::from_millis(1510));
        assert!(result.id.starts_with(GENERATION_ID_PREFIX));
        assert_eq!(result.image_url, "data:image/png;base64,AAA");
        assert_eq!(result.prompt, "a red hat");
        assert_eq!(result.style, "Streetwear");
        assert_eq!(sim.invocations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overloaded_fails_after_latency() {
        let sim = simulator(AttemptPlan::overloaded(Duration::from_millis(1000)));
        let started = Instant::now();

        let err = sim.invoke(&request(), &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err, RemoteError::ModelOverloaded);
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn arbitrary_failure_carries_message() {
        let sim = simulator(AttemptPlan::fail(Duration::ZERO, "network down"));
        let err = sim.invoke(&request(), &CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, RemoteError::Unknown(msg) if msg == "network down");
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_token_rejects_immediately() {
        let sim = simulator(AttemptPlan::succeed(Duration::from_secs(5)));
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();

        let err = sim.invoke(&request(), &token).await.unwrap_err();

        assert_eq!(err, RemoteError::Aborted);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(sim.invocations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_latency_settles_early() {
        let sim = Arc::new(simulator(AttemptPlan::succeed(Duration::from_millis(2000))));
        let token = CancellationToken::new();

        let handle = {
            let sim = Arc::clone(&sim);
            let token = token.clone();
            tokio::spawn(async move { sim.invoke(&request(), &token).await })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;
        let cancelled_at = Instant::now();
        token.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err, RemoteError::Aborted);
        assert!(cancelled_at.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_outcome_is_not_reported_after_cancel() {
        let sim = Arc::new(simulator(AttemptPlan::overloaded(Duration::from_millis(1000))));
        let token = CancellationToken::new();

        let handle = {
            let sim = Arc::clone(&sim);
            let token = token.clone();
            tokio::spawn(async move { sim.invoke(&request(), &token).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        assert_eq!(handle.await.unwrap().unwrap_err(), RemoteError::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn default_simulator_latency_within_bounds() {
        let sim = RemoteCallSimulator::default();
        let started = Instant::now();

        let _ = sim.invoke(&request(), &CancellationToken::new()).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed <= Duration::from_millis(2000));
    }
}
