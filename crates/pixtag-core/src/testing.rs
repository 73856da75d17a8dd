//! Fakes shared by unit tests.
use std::{
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pixtag_model::{JobId, LabelEntry, LabelIndex, ScoreVector};

use crate::{
    classify::Classifier,
    error::PipelineError,
    metrics::{JobOutcome, MetricsBackend},
};

pub fn job_id(n: u32) -> JobId {
    format!("{n:024x}").parse().unwrap()
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 80, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// `classes` labels named `class{i}`, with the given positions renamed.
pub fn label_index(classes: usize, named: &[(usize, &str)]) -> Arc<LabelIndex> {
    let entries = (0..classes)
        .map(|i| {
            let label = named
                .iter()
                .find(|(pos, _)| *pos == i)
                .map(|(_, l)| l.to_string())
                .unwrap_or_else(|| format!("class{i}"));
            LabelEntry::new(format!("n{i:08}"), label)
        })
        .collect();
    Arc::new(LabelIndex::from_entries(entries).unwrap())
}

pub struct FakeClassifier {
    response: Result<Vec<f64>, String>,
    calls: AtomicUsize,
    last: Mutex<Option<(u32, u32)>>,
}

impl FakeClassifier {
    pub fn returning(scores: Vec<f64>) -> Self {
        Self::with(Ok(scores))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with(Err(reason.to_string()))
    }

    fn with(response: Result<Vec<f64>, String>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_dimensions(&self) -> Option<(u32, u32)> {
        *self.last.lock().unwrap()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn classify(&self, image: &DynamicImage) -> Result<ScoreVector, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((image.width(), image.height()));
        match &self.response {
            Ok(scores) => Ok(ScoreVector::from(scores.clone())),
            Err(reason) => Err(PipelineError::InferenceService(reason.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub started: AtomicUsize,
    pub outcomes: Mutex<Vec<JobOutcome>>,
    pub stage_errors: Mutex<Vec<(String, String)>>,
    pub resized: AtomicUsize,
}

impl MetricsBackend for RecordingMetrics {
    fn record_job_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn record_job_completed(&self, outcome: JobOutcome, _: u64) {
        self.outcomes.lock().unwrap().push(outcome);
    }

    fn record_stage_error(&self, stage: &str, error_kind: &str) {
        self.stage_errors
            .lock()
            .unwrap()
            .push((stage.to_string(), error_kind.to_string()));
    }

    fn record_image_resized(&self) {
        self.resized.fetch_add(1, Ordering::SeqCst);
    }
}
