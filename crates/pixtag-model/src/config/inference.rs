use serde::{Deserialize, Serialize};

use crate::TimeoutMs;
use crate::config::EnvSource;
use crate::error::ModelResult;

/// External prediction service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Base URL, e.g. `http://tf-serving:8501`.
    pub server_url: String,
    /// Model name used in the predict path.
    pub model: String,
    /// Upper bound for one predict request.
    pub timeout_ms: TimeoutMs,
}

impl InferenceConfig {
    pub const DEFAULT_MODEL: &'static str = "resnet";
    pub const DEFAULT_TIMEOUT_MS: TimeoutMs = 30_000;

    /// Read `SERVER_URL`, `INFERENCE_MODEL` and `INFERENCE_TIMEOUT_MS`.
    pub fn from_source<F>(src: &EnvSource<F>) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server_url: src.required("SERVER_URL")?,
            model: src
                .optional("INFERENCE_MODEL")
                .unwrap_or_else(|| Self::DEFAULT_MODEL.into()),
            timeout_ms: src.parse_or("INFERENCE_TIMEOUT_MS", Self::DEFAULT_TIMEOUT_MS)?,
        })
    }

    /// Full predict endpoint: `{server_url}/v1/models/{model}:predict`.
    ///
    /// # Examples
    /// ```
    /// use pixtag_model::config::InferenceConfig;
    ///
    /// let cfg = InferenceConfig {
    ///     server_url: "http://serving:8501/".into(),
    ///     model: "resnet".into(),
    ///     timeout_ms: 1_000,
    /// };
    /// assert_eq!(cfg.predict_url(), "http://serving:8501/v1/models/resnet:predict");
    /// ```
    pub fn predict_url(&self) -> String {
        format!(
            "{}/v1/models/{}:predict",
            self.server_url.trim_end_matches('/'),
            self.model
        )
    }
}
