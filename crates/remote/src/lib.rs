//! Remote generation backends.
//!
//! [`GenerationBackend`] is what the generation controller calls;
//! [`RemoteCallSimulator`] implements it with configurable latency and
//! failure behaviour.

pub mod backend;
pub mod error;
pub mod simulator;
pub mod strategy;

pub use backend::GenerationBackend;
pub use error::RemoteError;
pub use simulator::RemoteCallSimulator;
pub use strategy::{AttemptPlan, PlannedOutcome, RandomStrategy, ScriptedStrategy, SimulationStrategy};
