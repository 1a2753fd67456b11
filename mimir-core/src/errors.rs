use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn storage(msg: impl std::fmt::Display) -> Self {
        CoreError::Storage(msg.to_string())
    }

    /// Store failures are the only errors a caller is expected to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }
}
