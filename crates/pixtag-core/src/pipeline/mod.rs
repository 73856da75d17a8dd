//! Per-job orchestration: retrieve, normalize, classify, map labels, tag.
mod state;
pub use state::{JobState, Stage};

use std::{future::Future, sync::Arc, time::Instant};

use pixtag_model::{JobId, LabelIndex, Metadata, config::NormalizeConfig};
use tracing::{debug, trace};

use crate::{
    classify::ClassifierHandle,
    error::{JobError, PipelineError},
    labels::LabelMapper,
    metrics::{MetricsHandle, noop_metrics},
    normalize::ImageNormalizer,
    store::StoreHandle,
    tagger::MetadataTagger,
};

/// Result of a job that reached [`JobState::Tagged`].
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: JobId,
    pub state: JobState,
    pub resized: bool,
    /// Metadata fragment written for this job.
    pub tags: Metadata,
    pub elapsed_ms: u64,
}

/// Tracks one job through its states.
#[derive(Debug)]
pub struct JobRun {
    job: JobId,
    state: JobState,
    started: Instant,
}

impl JobRun {
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            state: JobState::Received,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Drive one stage; success advances the state, failure moves it to `Failed`.
    pub async fn step<T, F>(&mut self, stage: Stage, work: F) -> Result<T, JobError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        debug_assert!(self.state.can_transition_to(stage.reached()));
        match work.await {
            Ok(value) => {
                self.state = stage.reached();
                trace!(job = %self.job, state = %self.state, "stage done");
                Ok(value)
            }
            Err(source) => {
                self.state = JobState::Failed;
                Err(JobError::new(self.job.as_str(), stage, source))
            }
        }
    }
}

/// Runs the stages for one job. No stage is retried.
pub struct JobPipeline {
    normalizer: ImageNormalizer,
    classifier: ClassifierHandle,
    mapper: LabelMapper,
    tagger: MetadataTagger,
    metrics: MetricsHandle,
}

impl JobPipeline {
    pub fn new(
        store: StoreHandle,
        classifier: ClassifierHandle,
        index: Arc<LabelIndex>,
        normalize: NormalizeConfig,
        top_k: usize,
    ) -> Self {
        Self {
            normalizer: ImageNormalizer::new(Arc::clone(&store), normalize),
            classifier,
            mapper: LabelMapper::new(index),
            tagger: MetadataTagger::new(store, top_k),
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Process `job` up to [`JobState::Tagged`].
    pub async fn run(&self, job: &JobId) -> Result<JobReport, JobError> {
        let mut run = JobRun::new(job.clone());

        let bytes = run
            .step(Stage::Retrieve, self.normalizer.retrieve(job))
            .await?;
        let normalized = run
            .step(Stage::Normalize, self.normalizer.normalize(job, bytes))
            .await?;
        if normalized.resized {
            self.metrics.record_image_resized();
        }

        let scores = run
            .step(Stage::Classify, self.classifier.classify(&normalized.image))
            .await?;
        let predictions = run
            .step(Stage::MapLabels, async { self.mapper.map(&scores) })
            .await?;
        let tags = run
            .step(Stage::Tag, self.tagger.tag(job, &predictions))
            .await?;

        debug!(job = %job, classifier = self.classifier.name(), elapsed_ms = run.elapsed_ms(), "job tagged");
        Ok(JobReport {
            job: job.clone(),
            state: run.state(),
            resized: normalized.resized,
            tags,
            elapsed_ms: run.elapsed_ms(),
        })
    }
}
