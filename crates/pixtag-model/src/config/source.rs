use std::{fmt::Display, str::FromStr};

use crate::error::{ModelError, ModelResult};

/// Key lookup used while building configuration.
///
/// Wraps any `Fn(&str) -> Option<String>` so tests can feed a plain map instead of the process environment.
/// Values that are empty or whitespace-only are treated as unset.
pub struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Create a source over the given lookup function.
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Trimmed value of `key`, if set and non-empty.
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Value of the first key in `keys` that is set.
    pub fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.optional(k))
    }

    /// Value of `key`, failing with [`ModelError::MissingVar`] when unset.
    pub fn required(&self, key: &'static str) -> ModelResult<String> {
        self.optional(key).ok_or(ModelError::MissingVar(key))
    }

    /// Parsed value of `key`, or `default` when unset.
    pub fn parse_or<T>(&self, key: &'static str, default: T) -> ModelResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }

    /// Parsed value of `key`, `None` when unset.
    pub fn parse_opt<T>(&self, key: &'static str) -> ModelResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ModelError::InvalidVar {
                    key,
                    reason: format!("{raw:?}: {e}"),
                })
            })
            .transpose()
    }
}
