//! TensorFlow-Serving style REST classifier.
//!
//! `POST {server}/v1/models/{model}:predict` with `{"instances": [tensor]}`,
//! answered by `{"predictions": [[score, ...]]}`.
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use pixtag_core::classify::{Classifier, ImageTensor, image_tensor};
use pixtag_core::error::PipelineError;
use pixtag_model::{ScoreVector, config::InferenceConfig};

use crate::error::{BackendError, BackendResult};

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [&'a ImageTensor; 1],
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f64>>,
}

/// Classifier backed by a remote prediction endpoint.
#[derive(Debug, Clone)]
pub struct ServingClassifier {
    client: reqwest::Client,
    url: String,
}

impl ServingClassifier {
    pub fn new(cfg: &InferenceConfig) -> BackendResult<Self> {
        let url = cfg.predict_url();
        reqwest::Url::parse(&url)
            .map_err(|e| BackendError::InvalidConfig(format!("predict url {url:?}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| BackendError::Init(format!("http client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn transport_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout(format!("inference request: {e}"))
    } else {
        PipelineError::InferenceService(format!("request failed: {e}"))
    }
}

#[async_trait]
impl Classifier for ServingClassifier {
    fn name(&self) -> &'static str {
        "serving"
    }

    async fn classify(&self, image: &DynamicImage) -> Result<ScoreVector, PipelineError> {
        let tensor = image_tensor(image);
        let request = PredictRequest {
            instances: [&tensor],
        };
        trace!(url = %self.url, height = tensor.len(), "sending predict request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(PipelineError::InferenceService(format!(
                "status {status}: {snippet}"
            )));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Timeout(format!("inference response: {e}"))
            } else {
                PipelineError::InferenceService(format!("malformed response: {e}"))
            }
        })?;
        let scores = body
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::InferenceService("empty prediction batch".into()))?;

        debug!(classes = scores.len(), "prediction received");
        Ok(ScoreVector::from(scores))
    }
}
