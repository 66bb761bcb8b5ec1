//! Generation orchestration: validation, retries with backoff,
//! cancellation and history commit.

pub mod controller;
pub mod error;
pub mod retry;
pub mod status;

pub use controller::{events, GenerationController};
pub use error::GenerationError;
pub use retry::{RetryPolicy, RetryState, DEFAULT_MAX_ATTEMPTS};
pub use status::{GenerationStatus, Phase};
