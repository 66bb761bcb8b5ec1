#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Image processing failed: {0}")]
    Image(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The human-readable message without the variant prefix.
    ///
    /// Used where the message is shown to the end user as-is (form errors).
    pub fn message(&self) -> String {
        match self {
            Self::NotFound { entity, id } => format!("{entity} with id {id} not found"),
            Self::Validation(msg) | Self::Image(msg) | Self::Internal(msg) => msg.clone(),
        }
    }
}
