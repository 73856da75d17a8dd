use std::sync::Arc;

/// How a job ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Tagged and acknowledged.
    Success,
    /// Left unacknowledged for redelivery.
    Failure,
    /// Stopped the worker.
    Fatal,
}

impl JobOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::Failure => "failure",
            JobOutcome::Fatal => "fatal",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// A delivery was taken from the queue.
    fn record_job_started(&self);

    /// A job finished with the given outcome after `duration_ms`.
    fn record_job_completed(&self, outcome: JobOutcome, duration_ms: u64);

    /// A pipeline stage failed.
    ///
    /// # Arguments
    /// - `stage`: failing stage name (`retrieve`, `classify`, ...)
    /// - `error_kind`: error category (`not_found`, `inference_service`, ...)
    fn record_stage_error(&self, stage: &str, error_kind: &str);

    /// The normalizer replaced an oversized image.
    fn record_image_resized(&self);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
