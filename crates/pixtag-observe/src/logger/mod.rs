mod config;
mod error;
mod logger;
mod object;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use object::LoggerFormat;
pub use object::LoggerLevel;
pub use object::{LoggerTimeZone, init_local_offset};

/// Install the process-wide `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when called twice.
/// With [`LoggerTimeZone::Local`], run [`init_local_offset`] first, before any runtime thread exists.
///
/// # Examples
/// ```rust
/// use pixtag_observe::{LoggerConfig, init_logger};
///
/// let cfg = LoggerConfig::from_lookup(|_| None).unwrap();
/// init_logger(&cfg).unwrap();
/// tracing::info!(job = "65f1c2a9e4b0a1b2c3d4e5f6", "logger ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    logger::install(cfg)
}
