use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TimeoutMs;
use crate::config::EnvSource;
use crate::error::{ModelError, ModelResult};

/// How to reach the content store.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreConnection {
    /// Full connection string; takes precedence over discrete settings.
    Uri {
        #[serde(skip_serializing, default)]
        uri: String,
    },
    /// Discrete host/port/credentials.
    Discrete {
        host: String,
        port: u16,
        username: Option<String>,
        #[serde(skip_serializing)]
        password: Option<String>,
        /// Authentication mechanism name; `DEFAULT` lets the driver negotiate.
        auth_mechanism: String,
    },
}

impl fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreConnection::Uri { .. } => f.debug_struct("Uri").field("uri", &"<redacted>").finish(),
            StoreConnection::Discrete {
                host,
                port,
                username,
                auth_mechanism,
                ..
            } => f
                .debug_struct("Discrete")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("auth_mechanism", auth_mechanism)
                .finish(),
        }
    }
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub connection: StoreConnection,
    /// Database holding the image records.
    pub database: String,
    /// Record id space (GridFS bucket name).
    pub bucket: String,
    /// Upper bound for a single store call.
    pub timeout_ms: TimeoutMs,
}

impl StoreConfig {
    pub const DEFAULT_PORT: u16 = 27017;
    pub const DEFAULT_BUCKET: &'static str = "fs";
    pub const DEFAULT_TIMEOUT_MS: TimeoutMs = 10_000;

    /// Read `MONGODB_*` and `STORE_TIMEOUT_MS` variables.
    pub fn from_source<F>(src: &EnvSource<F>) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection = match src.optional("MONGODB_CONNECTION_STRING") {
            Some(uri) => StoreConnection::Uri { uri },
            None => StoreConnection::Discrete {
                host: src.optional("MONGODB_HOST").ok_or(ModelError::MissingVar(
                    "MONGODB_CONNECTION_STRING or MONGODB_HOST",
                ))?,
                port: src.parse_or("MONGODB_PORT", Self::DEFAULT_PORT)?,
                username: src.optional("MONGODB_USERNAME"),
                password: src.optional("MONGODB_PASSWORD"),
                // The misspelled name is still honoured for existing deployments.
                auth_mechanism: src
                    .first_of(&["MONGODB_AUTH_MECHANISM", "MONGODB_AUTH_MECHNISM"])
                    .unwrap_or_else(|| "DEFAULT".into()),
            },
        };

        Ok(Self {
            connection,
            database: src.required("MONGODB_DB")?,
            bucket: src
                .optional("MONGODB_BUCKET")
                .unwrap_or_else(|| Self::DEFAULT_BUCKET.into()),
            timeout_ms: src.parse_or("STORE_TIMEOUT_MS", Self::DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> ModelResult<StoreConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        StoreConfig::from_source(&EnvSource::new(|k: &str| map.get(k).map(|v| v.to_string())))
    }

    #[test]
    fn connection_string_wins() {
        let cfg = from(&[
            ("MONGODB_CONNECTION_STRING", "mongodb://u:p@db:27017"),
            ("MONGODB_HOST", "ignored"),
            ("MONGODB_DB", "images"),
        ])
        .unwrap();

        assert!(matches!(cfg.connection, StoreConnection::Uri { .. }));
        assert_eq!(cfg.bucket, "fs");
        assert_eq!(cfg.timeout_ms, 10_000);
        assert!(!format!("{cfg:?}").contains("u:p"));
    }

    #[test]
    fn discrete_settings_with_legacy_auth_name() {
        let cfg = from(&[
            ("MONGODB_HOST", "db"),
            ("MONGODB_USERNAME", "worker"),
            ("MONGODB_PASSWORD", "secret"),
            ("MONGODB_AUTH_MECHNISM", "SCRAM-SHA-256"),
            ("MONGODB_DB", "images"),
            ("MONGODB_BUCKET", "photos"),
        ])
        .unwrap();

        match &cfg.connection {
            StoreConnection::Discrete {
                host,
                port,
                username,
                auth_mechanism,
                ..
            } => {
                assert_eq!(host, "db");
                assert_eq!(*port, 27017);
                assert_eq!(username.as_deref(), Some("worker"));
                assert_eq!(auth_mechanism, "SCRAM-SHA-256");
            }
            other => panic!("expected discrete connection, got {other:?}"),
        }
        assert_eq!(cfg.bucket, "photos");
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn missing_connection_is_reported() {
        let err = from(&[("MONGODB_DB", "images")]).unwrap_err();
        assert!(err.to_string().contains("MONGODB_HOST"));
    }
}
