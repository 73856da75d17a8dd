use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use pixtag_core::{JobOutcome, MetricsBackend};

const NAMESPACE: &str = "pixtag";

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `outcome`: "success", "failure", "fatal"
/// - `stage`: "receive", "retrieve", "normalize", "classify", "map_labels", "tag", "acknowledge"
/// - `error_kind`: "not_found", "inference_service", "timeout", ...
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_started: Counter,
    jobs_completed: CounterVec,
    job_duration: HistogramVec,
    stage_errors: CounterVec,
    images_resized: Counter,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering into `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_started = Counter::with_opts(
            Opts::new("jobs_started_total", "Deliveries taken from the queue").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(jobs_started.clone()))?;

        let jobs_completed = CounterVec::new(
            Opts::new("jobs_completed_total", "Jobs finished, by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        let job_duration = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Time from delivery to ack or failure")
                .namespace(NAMESPACE)
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let stage_errors = CounterVec::new(
            Opts::new("stage_errors_total", "Pipeline stage failures").namespace(NAMESPACE),
            &["stage", "error_kind"],
        )?;
        registry.register(Box::new(stage_errors.clone()))?;

        let images_resized = Counter::with_opts(
            Opts::new("images_resized_total", "Stored images replaced by a smaller copy")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(images_resized.clone()))?;

        Ok(Self {
            jobs_started,
            jobs_completed,
            job_duration,
            stage_errors,
            images_resized,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metric families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format for a `/metrics` response body.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_started(&self) {
        self.jobs_started.inc();
    }

    fn record_job_completed(&self, outcome: JobOutcome, duration_ms: u64) {
        self.jobs_completed
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.job_duration
            .with_label_values(&[outcome.as_label()])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_stage_error(&self, stage: &str, error_kind: &str) {
        self.stage_errors
            .with_label_values(&[stage, error_kind])
            .inc();
    }

    fn record_image_resized(&self) {
        self.images_resized.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn started_and_resized_are_plain_counters() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_job_started();
        metrics.record_job_started();
        metrics.record_image_resized();

        let families = metrics.gather();
        assert_eq!(family(&families, "pixtag_jobs_started_total").get_metric().len(), 1);
        assert_eq!(family(&families, "pixtag_images_resized_total").get_metric().len(), 1);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("pixtag_jobs_started_total 2"), "{text}");
        assert!(text.contains("pixtag_images_resized_total 1"), "{text}");
    }

    #[test]
    fn completions_are_split_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_job_completed(JobOutcome::Success, 150);
        metrics.record_job_completed(JobOutcome::Failure, 50);
        metrics.record_job_completed(JobOutcome::Success, 80);

        let families = metrics.gather();
        assert_eq!(family(&families, "pixtag_jobs_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "pixtag_job_duration_seconds").get_metric().len(), 2);
    }

    #[test]
    fn stage_errors_are_labelled() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_stage_error("classify", "inference_service");
        metrics.record_stage_error("classify", "inference_service");
        metrics.record_stage_error("retrieve", "not_found");

        let families = metrics.gather();
        assert_eq!(family(&families, "pixtag_stage_errors_total").get_metric().len(), 2);
    }

    #[test]
    fn text_exposition_lists_metrics() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_stage_error("retrieve", "not_found");

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("pixtag_stage_errors_total{error_kind=\"not_found\",stage=\"retrieve\"} 1"));
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
