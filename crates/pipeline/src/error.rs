use studio_core::error::CoreError;

/// Terminal failure of a generation invocation.
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The request was not ready (missing image or blank prompt). No
    /// attempt was made.
    #[error("{0}")]
    InvalidInput(String),

    /// The invocation was aborted.
    #[error("Generation cancelled")]
    Cancelled,

    /// Every attempt failed.
    #[error("Failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// Another invocation is still in flight.
    #[error("A generation is already in progress")]
    AlreadyRunning,
}

impl From<CoreError> for GenerationError {
    fn from(err: CoreError) -> Self {
        Self::InvalidInput(err.message())
    }
}
