use thiserror::Error;

/// Errors raised while constructing a backend.
///
/// Runtime failures are reported through the core error types instead.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("backend initialization failed: {0}")]
    Init(String),
}

pub type BackendResult<T> = Result<T, BackendError>;
