//! The seam between the generation controller and whatever produces images.

use studio_core::generation::{GenerationRequest, GenerationResult};
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;

/// A single remote generation call.
///
/// Implementations must observe `token`: once it fires, the call
/// resolves with [`RemoteError::Aborted`] and never with a result.
pub trait GenerationBackend: Send + Sync {
    /// Run one attempt for `request`.
    fn invoke(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<GenerationResult, RemoteError>> + Send;
}
