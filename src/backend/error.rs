use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

/// Failures of a backend request/response call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Call did not resolve in time
    #[error("Backend call timed out")]
    Timeout,

    /// Backend answered with a refusal
    #[error("Backend rejected call: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Create a new unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        BackendError::Unavailable(msg.into())
    }

    /// Create a new rejected error
    pub fn rejected<S: Into<String>>(msg: S) -> Self {
        BackendError::Rejected(msg.into())
    }
}
