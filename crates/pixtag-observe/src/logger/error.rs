use thiserror::Error;

/// Logger configuration and initialization failures.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// `LOG_FORMAT` is not one of `text`, `json`, `journald`.
    #[error("unknown log format {0:?}, expected text, json or journald")]
    InvalidFormat(String),

    #[error("journald output is only available on linux")]
    JournaldNotSupported,

    #[error("journald socket unavailable: {0}")]
    JournaldInitFailed(String),

    /// A global subscriber was installed before this one.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("unknown log timezone {0:?}, expected utc or local")]
    InvalidTimeZone(String),

    #[error("bad log filter {0}")]
    InvalidLevel(String),

    #[error("{key} must be a boolean, got {value:?}")]
    InvalidFlag { key: &'static str, value: String },
}

pub type LoggerResult<T> = Result<T, LoggerError>;
