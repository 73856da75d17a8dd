use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// Filter directive for the logger, e.g. `info` or `pixtag_core=debug,lapin=warn,info`.
///
/// The text is checked against `EnvFilter` syntax when built, so [`to_env_filter`](Self::to_env_filter)
/// never sees an invalid directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// # Examples
    /// ```
    /// use pixtag_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("pixtag_core=debug,info").unwrap();
    /// assert_eq!(lvl.as_str(), "pixtag_core=debug,info");
    /// assert!(LoggerLevel::new("pixtag_core=loud").is_err());
    /// ```
    pub fn new(directive: impl Into<String>) -> Result<Self, LoggerError> {
        let directive = directive.into().trim().to_string();
        EnvFilter::try_new(&directive)
            .map_err(|e| LoggerError::InvalidLevel(format!("{directive:?}: {e}")))?;
        Ok(Self(directive))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".into())
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_directives_parse() {
        let lvl: LoggerLevel = " pixtag_core=trace,lapin=warn,info ".parse().unwrap();
        assert_eq!(lvl.to_string(), "pixtag_core=trace,lapin=warn,info");
        assert!("warn".parse::<LoggerLevel>().is_ok());
    }

    #[test]
    fn unknown_level_names_fail() {
        let err = "pixtag_core=verbose".parse::<LoggerLevel>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLevel(msg) if msg.contains("verbose")));
    }

    #[test]
    fn deserialize_validates() {
        let lvl: LoggerLevel = serde_json::from_str(r#""debug""#).unwrap();
        assert_eq!(lvl, LoggerLevel::new("debug").unwrap());
        assert!(serde_json::from_str::<LoggerLevel>(r#""x=nope""#).is_err());
        assert_eq!(serde_json::to_string(&lvl).unwrap(), r#""debug""#);
    }
}
