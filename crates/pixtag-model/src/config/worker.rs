use std::{net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{EnvSource, InferenceConfig, QueueConfig, StoreConfig};
use crate::error::{ModelError, ModelResult};
use crate::strategy::{BackoffStrategy, RestartStrategy};

/// Image normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeConfig {
    /// Images with either side above this are scaled so the longer side equals it.
    pub max_dimension: u32,
    /// Quality used when re-encoding lossy formats.
    pub jpeg_quality: u8,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_dimension: 600,
            jpeg_quality: 95,
        }
    }
}

/// Restart policy for consumer sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerConfig {
    pub restart: RestartStrategy,
    pub backoff: BackoffStrategy,
}

/// Complete, immutable worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    pub queue: QueueConfig,
    pub store: StoreConfig,
    pub inference: InferenceConfig,
    pub normalize: NormalizeConfig,
    /// Number of top-scoring labels written to metadata.
    pub top_k: usize,
    /// Class-index JSON loaded once at startup.
    pub label_index_path: PathBuf,
    pub consumer: ConsumerConfig,
    /// Bind address of the `/metrics` endpoint; disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<SocketAddr>,
}

impl WorkerConfig {
    pub const DEFAULT_TOP_K: usize = 5;
    pub const DEFAULT_LABEL_INDEX: &'static str = "imagenet_class_index.json";

    /// Build the configuration from the process environment.
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = EnvSource::new(lookup);

        let top_k = src.parse_or("TOP_X", Self::DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(ModelError::InvalidVar {
                key: "TOP_X",
                reason: "must be at least 1".into(),
            });
        }

        let defaults = NormalizeConfig::default();
        let normalize = NormalizeConfig {
            max_dimension: src.parse_or("NORMALIZE_MAX_DIMENSION", defaults.max_dimension)?,
            jpeg_quality: src.parse_or("NORMALIZE_JPEG_QUALITY", defaults.jpeg_quality)?,
        };
        if normalize.max_dimension == 0 {
            return Err(ModelError::InvalidVar {
                key: "NORMALIZE_MAX_DIMENSION",
                reason: "must be at least 1".into(),
            });
        }
        if !(1..=100).contains(&normalize.jpeg_quality) {
            return Err(ModelError::InvalidVar {
                key: "NORMALIZE_JPEG_QUALITY",
                reason: "must be within 1..=100".into(),
            });
        }

        let backoff = BackoffStrategy::default();
        let consumer = ConsumerConfig {
            restart: src.parse_or("CONSUMER_RESTART", RestartStrategy::default())?,
            backoff: BackoffStrategy {
                jitter: src.parse_or("CONSUMER_JITTER", backoff.jitter)?,
                first_ms: src.parse_or("CONSUMER_BACKOFF_FIRST_MS", backoff.first_ms)?,
                max_ms: src.parse_or("CONSUMER_BACKOFF_MAX_MS", backoff.max_ms)?,
                factor: src.parse_or("CONSUMER_BACKOFF_FACTOR", backoff.factor)?,
            },
        };

        Ok(Self {
            queue: QueueConfig::from_source(&src)?,
            store: StoreConfig::from_source(&src)?,
            inference: InferenceConfig::from_source(&src)?,
            normalize,
            top_k,
            label_index_path: src
                .optional("LABEL_INDEX_PATH")
                .unwrap_or_else(|| Self::DEFAULT_LABEL_INDEX.into())
                .into(),
            consumer,
            metrics_addr: src.parse_opt("METRICS_ADDR")?,
        })
    }
}
