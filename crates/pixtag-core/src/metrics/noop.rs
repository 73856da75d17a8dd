use crate::metrics::backend::{JobOutcome, MetricsBackend};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_job_started(&self) {}

    #[inline(always)]
    fn record_job_completed(&self, _: JobOutcome, _: u64) {}

    #[inline(always)]
    fn record_stage_error(&self, _: &str, _: &str) {}

    #[inline(always)]
    fn record_image_resized(&self) {}
}
