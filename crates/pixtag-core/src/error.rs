use thiserror::Error;

use pixtag_model::TimeoutMs;

use crate::pipeline::Stage;

/// Failures reported by a content store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store unreachable: {0}")]
    Connectivity(String),

    #[error("store operation '{op}' timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: TimeoutMs },

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue unreachable: {0}")]
    Connectivity(String),

    #[error("acknowledgment failed: {0}")]
    Ack(String),

    #[error("queue protocol error: {0}")]
    Protocol(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Error kinds a single job can fail with.
///
/// Only [`PipelineError::IndexMismatch`] is fatal for the process; every other kind
/// leaves the delivery unacknowledged and ends the consumer session.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("connectivity: {0}")]
    Connectivity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("inference service: {0}")]
    InferenceService(String),

    #[error("label index holds {expected} entries but the model returned {actual} scores")]
    IndexMismatch { expected: usize, actual: usize },

    #[error("image: {0}")]
    Image(String),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl PipelineError {
    /// Returns `true` for configuration conditions no retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::IndexMismatch { .. })
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Connectivity(_) => "connectivity",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::InferenceService(_) => "inference_service",
            PipelineError::IndexMismatch { .. } => "index_mismatch",
            PipelineError::Image(_) => "image",
            PipelineError::InvalidJob(_) => "invalid_job",
            PipelineError::Timeout(_) => "timeout",
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => PipelineError::NotFound(id),
            StoreError::Connectivity(msg) | StoreError::Backend(msg) => {
                PipelineError::Connectivity(msg)
            }
            e @ StoreError::Timeout { .. } => PipelineError::Timeout(e.to_string()),
        }
    }
}

/// A pipeline failure tagged with the job and the stage that failed.
#[derive(Debug, Error)]
#[error("job {job} failed at stage '{stage}': {source}")]
pub struct JobError {
    /// Job id, or the lossy message body when it did not parse.
    pub job: String,
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl JobError {
    pub fn new(job: impl Into<String>, stage: Stage, source: PipelineError) -> Self {
        Self {
            job: job.into(),
            stage,
            source,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }
}

/// Reasons a consumer session ends early.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl ConsumerError {
    pub fn is_fatal(&self) -> bool {
        match self {
            ConsumerError::Queue(_) => false,
            ConsumerError::Job(e) => e.is_fatal(),
        }
    }
}
