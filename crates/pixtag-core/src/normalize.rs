//! Decode, downsize and re-store oversized images.
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder, imageops::FilterType};
use pixtag_model::{JobId, config::NormalizeConfig};
use tracing::{debug, trace};

use crate::{error::PipelineError, store::StoreHandle};

/// Decoded image ready for classification.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// Dimensions as stored before normalization.
    pub original: (u32, u32),
    /// `true` when the stored bytes were replaced.
    pub resized: bool,
}

/// Bounds stored images to `max_dimension` on their longer side.
pub struct ImageNormalizer {
    store: StoreHandle,
    cfg: NormalizeConfig,
}

impl ImageNormalizer {
    pub fn new(store: StoreHandle, cfg: NormalizeConfig) -> Self {
        Self { store, cfg }
    }

    /// Fetch the stored payload.
    pub async fn retrieve(&self, id: &JobId) -> Result<Vec<u8>, PipelineError> {
        let bytes = self.store.get(id).await?;
        trace!(job = %id, bytes = bytes.len(), "image retrieved");
        Ok(bytes)
    }

    /// Decode `bytes`; if oversized, re-encode smaller and overwrite the stored payload under `id`.
    pub async fn normalize(&self, id: &JobId, bytes: Vec<u8>) -> Result<Normalized, PipelineError> {
        let cfg = self.cfg;
        let (normalized, encoded) = tokio::task::spawn_blocking(move || prepare(&bytes, cfg))
            .await
            .map_err(|e| PipelineError::Image(format!("normalizer task failed: {e}")))??;

        match encoded {
            Some(encoded) => {
                let (width, height) = normalized.original;
                debug!(
                    job = %id,
                    width,
                    height,
                    new_width = normalized.image.width(),
                    new_height = normalized.image.height(),
                    bytes = encoded.len(),
                    "replacing oversized image",
                );
                self.store.replace(id, encoded).await?;
            }
            None => trace!(job = %id, "image within bounds, left untouched"),
        }
        Ok(normalized)
    }
}

/// Target size for an image, or `None` when it already fits.
///
/// The longer side becomes `max`; the shorter side scales proportionally, rounded, never below 1px.
pub fn target_dimensions(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width <= max && height <= max {
        return None;
    }
    let scale = |side: u32, longer: u32| {
        ((f64::from(side) * f64::from(max) / f64::from(longer)).round() as u32).max(1)
    };
    Some(if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    })
}

/// Decode and, when needed, resize and re-encode. CPU bound.
fn prepare(
    bytes: &[u8],
    cfg: NormalizeConfig,
) -> Result<(Normalized, Option<Vec<u8>>), PipelineError> {
    let format = image::guess_format(bytes)
        .map_err(|e| PipelineError::Image(format!("unrecognized image format: {e}")))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PipelineError::Image(format!("decode failed: {e}")))?;
    let original = (image.width(), image.height());

    let Some((w, h)) = target_dimensions(original.0, original.1, cfg.max_dimension) else {
        let normalized = Normalized {
            image,
            format,
            original,
            resized: false,
        };
        return Ok((normalized, None));
    };

    let resized = image.resize_exact(w, h, FilterType::Lanczos3);
    let encoded = encode(&resized, format, cfg.jpeg_quality)?;
    let normalized = Normalized {
        image: resized,
        format,
        original,
        resized: true,
    };
    Ok((normalized, Some(encoded)))
}

/// Encode in `format`; JPEG uses the configured quality.
fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    let res = match format {
        ImageFormat::Jpeg => image
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality)),
        other => image.write_to(&mut Cursor::new(&mut buf), other),
    };
    res.map_err(|e| PipelineError::Image(format!("encode as {format:?} failed: {e}")))?;
    Ok(buf)
}
