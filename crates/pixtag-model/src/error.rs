use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    #[error("invalid label index: {0}")]
    InvalidLabelIndex(String),

    #[error("missing required variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidVar { key: &'static str, reason: String },

    #[error("unknown restart strategy: {0}")]
    UnknownRestart(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
