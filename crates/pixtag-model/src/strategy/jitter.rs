use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to restart backoff delays.
///
/// Several workers losing the broker at the same moment would otherwise reconnect in lockstep.
///
/// Read from `CONSUMER_JITTER`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    /// No randomness applied.
    None,
    /// Delay is uniformly sampled from `[0, base]`.
    #[default]
    Full,
    /// Delay is sampled around the midpoint (`base / 2`).
    Equal,
    /// Delay is sampled from `min(max, rand(base * 3))`.
    Decorrelated,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(JitterStrategy::Equal),
            "" | "none" => Ok(JitterStrategy::None),
            "full" | "default" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive() {
        assert_eq!("FULL".parse::<JitterStrategy>().unwrap(), JitterStrategy::Full);
        assert_eq!(" equal ".parse::<JitterStrategy>().unwrap(), JitterStrategy::Equal);
        assert_eq!("none".parse::<JitterStrategy>().unwrap(), JitterStrategy::None);
        assert_eq!(
            "decorrelated".parse::<JitterStrategy>().unwrap(),
            JitterStrategy::Decorrelated
        );
        assert!("random".parse::<JitterStrategy>().is_err());
    }
}
