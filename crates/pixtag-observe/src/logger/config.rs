use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::{
    error::{LoggerError, LoggerResult},
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Settings for the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Text, JSON or journald output.
    pub format: LoggerFormat,
    /// Log level filter expression (e.g., "info", "pixtag_core=debug,info").
    pub level: LoggerLevel,
    /// Offset applied to RFC3339 timestamps.
    pub tz: LoggerTimeZone,
    /// Print the event target (module path).
    pub with_targets: bool,
    /// ANSI colors for text output on a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Build from `LOG_FORMAT`, `LOG_LEVEL`, `LOG_TZ`, `LOG_TARGETS` and `LOG_COLOR`.
    ///
    /// Unset or blank variables keep their defaults.
    ///
    /// # Examples
    /// ```rust
    /// use pixtag_observe::{LoggerConfig, LoggerFormat};
    ///
    /// let cfg = LoggerConfig::from_lookup(|key| match key {
    ///     "LOG_FORMAT" => Some("json".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(cfg.format, LoggerFormat::Json);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("LOG_FORMAT") {
            cfg.format = v.parse()?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            cfg.level = v.parse()?;
        }
        if let Some(v) = get("LOG_TZ") {
            cfg.tz = v.parse()?;
        }
        if let Some(v) = get("LOG_TARGETS") {
            cfg.with_targets = parse_flag("LOG_TARGETS", &v)?;
        }
        if let Some(v) = get("LOG_COLOR") {
            cfg.use_color = parse_flag("LOG_COLOR", &v)?;
        }
        Ok(cfg)
    }

    /// Color is used only when enabled in config and stdout is a terminal.
    ///
    /// Call during logger initialization, not during config parsing, so terminal detection reflects the running process.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

fn parse_flag(key: &'static str, value: &str) -> LoggerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LoggerError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
