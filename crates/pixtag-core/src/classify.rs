//! Inference client seam.
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use pixtag_model::ScoreVector;

use crate::error::PipelineError;

/// Produces one raw score per class for an image.
///
/// Implementations report every transport or protocol failure as
/// [`PipelineError::InferenceService`] (or [`PipelineError::Timeout`]).
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, image: &DynamicImage) -> Result<ScoreVector, PipelineError>;
}

/// Shared handle to a classifier.
pub type ClassifierHandle = Arc<dyn Classifier>;

/// `height x width x 3` RGB tensor with channels scaled into `0.0..=1.0`.
pub type ImageTensor = Vec<Vec<[f32; 3]>>;

/// Convert an image into the tensor layout expected by the prediction endpoint.
pub fn image_tensor(image: &DynamicImage) -> ImageTensor {
    let rgb = image.to_rgb8();
    rgb.rows()
        .map(|row| {
            row.map(|px| {
                let [r, g, b] = px.0;
                [scale(r), scale(g), scale(b)]
            })
            .collect()
        })
        .collect()
}

#[inline]
fn scale(channel: u8) -> f32 {
    f32::from(channel) / 255.0
}
