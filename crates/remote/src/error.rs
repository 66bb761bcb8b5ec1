/// Failure of a single remote call attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The invocation's cancellation token fired.
    #[error("Request aborted")]
    Aborted,

    /// Simulated transient backend failure.
    #[error("Model overloaded")]
    ModelOverloaded,

    /// Any other failure surfacing from the call.
    #[error("{0}")]
    Unknown(String),
}

impl RemoteError {
    /// Whether a new attempt may follow this failure. Cancellation is
    /// always terminal.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}
