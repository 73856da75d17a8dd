use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Length of a store object id in its hexadecimal text form.
pub const JOB_ID_LEN: usize = 24;

/// Identifier of a stored image delivered as the queue message body.
///
/// The worker only references ids; it never creates or destroys the underlying records.
/// A valid id is exactly [`JOB_ID_LEN`] ASCII hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Parse a raw message body.
    ///
    /// The body must be UTF-8; surrounding whitespace is ignored.
    ///
    /// # Examples
    /// ```
    /// use pixtag_model::JobId;
    ///
    /// let id = JobId::parse(b"65f1c2a9e4b0a1b2c3d4e5f6").unwrap();
    /// assert_eq!(id.as_str(), "65f1c2a9e4b0a1b2c3d4e5f6");
    /// assert!(JobId::parse(b"not-an-id").is_err());
    /// ```
    pub fn parse(body: &[u8]) -> ModelResult<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|e| ModelError::InvalidJobId(format!("body is not utf-8: {e}")))?;
        text.trim().parse()
    }

    /// Returns the id as `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for JobId {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() != JOB_ID_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ModelError::InvalidJobId(format!(
                "expected {JOB_ID_LEN} hex digits, got {s:?}"
            )));
        }
        Ok(Self(s))
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
