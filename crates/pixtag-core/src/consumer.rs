//! Queue consumer: one session, one job at a time.
//!
//! A session ends on the first failed job. The failed delivery is dropped unacknowledged and the
//! connection is closed so the broker requeues it; the supervisor decides when to reconnect.
use std::{sync::Arc, time::Instant};

use pixtag_model::JobId;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    error::{ConsumerError, JobError, PipelineError},
    metrics::{JobOutcome, MetricsHandle},
    pipeline::{JobPipeline, JobReport, Stage},
    queue::{ConnectorHandle, DeliveryGuard, JobSource},
};

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The source reported no further deliveries.
    Drained,
    /// Shutdown was requested.
    Canceled,
}

pub struct Consumer {
    connector: ConnectorHandle,
    pipeline: Arc<JobPipeline>,
    metrics: MetricsHandle,
}

impl Consumer {
    pub fn new(connector: ConnectorHandle, pipeline: Arc<JobPipeline>) -> Self {
        let metrics = Arc::clone(pipeline.metrics());
        Self {
            connector,
            pipeline,
            metrics,
        }
    }

    /// Open a session and process deliveries until it ends.
    pub async fn run_session(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, ConsumerError> {
        let mut source = self.connector.connect().await?;
        info!(queue = self.connector.name(), "consumer session opened");

        let result = self.consume(source.as_mut(), cancel).await;

        if let Err(e) = source.close().await {
            warn!(error = %e, "consumer session did not close cleanly");
        }
        match &result {
            Ok(end) => info!(end = ?end, "consumer session ended"),
            Err(e) => warn!(error = %e, "consumer session aborted"),
        }
        result
    }

    async fn consume(
        &self,
        source: &mut dyn JobSource,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, ConsumerError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(SessionEnd::Canceled),
                next = source.next() => next?,
            };
            let Some(delivery) = next else {
                return Ok(SessionEnd::Drained);
            };

            let guard = DeliveryGuard::new(delivery);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("shutdown while a job was in flight; delivery left unacknowledged");
                    return Ok(SessionEnd::Canceled);
                }
                res = self.handle(guard) => {
                    res?;
                }
            }
        }
    }

    /// Run one delivery through the pipeline and acknowledge it on success.
    async fn handle(&self, guard: DeliveryGuard) -> Result<JobReport, ConsumerError> {
        self.metrics.record_job_started();
        let started = Instant::now();

        let result = self.process(guard).await;

        let outcome = match &result {
            Ok(_) => JobOutcome::Success,
            Err(e) if e.is_fatal() => JobOutcome::Fatal,
            Err(_) => JobOutcome::Failure,
        };
        self.metrics
            .record_job_completed(outcome, started.elapsed().as_millis() as u64);

        if let Err(e) = &result {
            self.metrics
                .record_stage_error(e.stage.as_str(), e.source.kind());
            error!(
                job = %e.job,
                stage = %e.stage,
                error_kind = e.source.kind(),
                fatal = e.is_fatal(),
                error = %e.source,
                "job failed",
            );
        }
        result.map_err(ConsumerError::from)
    }

    async fn process(&self, guard: DeliveryGuard) -> Result<JobReport, JobError> {
        let job = JobId::parse(guard.body()).map_err(|e| {
            JobError::new(
                String::from_utf8_lossy(guard.body()),
                Stage::Receive,
                PipelineError::InvalidJob(e.to_string()),
            )
        })?;
        info!(job = %job, redelivered = guard.redelivered(), "job received");

        let mut report = self.pipeline.run(&job).await?;

        guard.complete().await.map_err(|e| {
            JobError::new(
                job.as_str(),
                Stage::Acknowledge,
                PipelineError::Connectivity(e.to_string()),
            )
        })?;
        report.state = Stage::Acknowledge.reached();

        info!(
            job = %job,
            resized = report.resized,
            top = ?report.tags.get("prediction1"),
            elapsed_ms = report.elapsed_ms,
            "job complete",
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use image::ImageFormat;
    use pixtag_model::config::NormalizeConfig;

    use super::*;
    use crate::error::QueueError;
    use crate::queue::MemoryQueue;
    use crate::store::MemoryStore;
    use crate::testing::{FakeClassifier, RecordingMetrics, encoded_image, job_id, label_index};

    struct Fixture {
        queue: MemoryQueue,
        store: Arc<MemoryStore>,
        classifier: Arc<FakeClassifier>,
        metrics: Arc<RecordingMetrics>,
        consumer: Consumer,
    }

    fn fixture(classifier: FakeClassifier) -> Fixture {
        let queue = MemoryQueue::new();
        let store = Arc::new(MemoryStore::new());
        let classifier = Arc::new(classifier);
        let metrics = Arc::new(RecordingMetrics::default());

        let pipeline = JobPipeline::new(
            store.clone(),
            classifier.clone(),
            label_index(4, &[(2, "Chihuahua")]),
            NormalizeConfig::default(),
            2,
        )
        .with_metrics(metrics.clone());
        let consumer = Consumer::new(Arc::new(queue.clone()), Arc::new(pipeline));

        Fixture {
            queue,
            store,
            classifier,
            metrics,
            consumer,
        }
    }

    fn seed(f: &Fixture, n: u32) {
        f.store
            .insert(job_id(n), format!("{n}.png"), encoded_image(40, 30, ImageFormat::Png));
        f.queue.publish(job_id(n).as_str());
    }

    #[tokio::test]
    async fn successful_jobs_are_acknowledged() {
        let f = fixture(FakeClassifier::returning(vec![0.1, 0.2, 0.6, 0.1]));
        seed(&f, 1);
        seed(&f, 2);

        let end = f.consumer.run_session(&CancellationToken::new()).await.unwrap();

        assert_eq!(end, SessionEnd::Drained);
        assert_eq!(f.queue.acked().len(), 2);
        assert_eq!(f.queue.unacked(), 0);
        for n in [1, 2] {
            let md = f.store.stored_metadata(&job_id(n)).unwrap();
            assert_eq!(md.get("prediction1").unwrap(), "Chihuahua");
        }
        assert_eq!(f.metrics.started.load(Ordering::SeqCst), 2);
        assert_eq!(
            *f.metrics.outcomes.lock().unwrap(),
            vec![JobOutcome::Success, JobOutcome::Success]
        );
    }

    #[tokio::test]
    async fn inference_failure_leaves_delivery_for_redelivery() {
        let f = fixture(FakeClassifier::failing("status 503 Service Unavailable"));
        seed(&f, 1);

        let err = f
            .consumer
            .run_session(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(!err.is_fatal());
        assert!(matches!(
            &err,
            ConsumerError::Job(JobError {
                stage: Stage::Classify,
                source: PipelineError::InferenceService(_),
                ..
            })
        ));
        assert!(f.queue.acked().is_empty());
        assert_eq!(f.queue.ready(), 1);
        assert_eq!(f.store.ops().metadata_writes, 0);
        assert_eq!(
            *f.metrics.stage_errors.lock().unwrap(),
            vec![("classify".to_string(), "inference_service".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_job_is_retried_by_next_session() {
        let f = fixture(FakeClassifier::returning(vec![0.1, 0.2, 0.6, 0.1]));
        f.queue.publish(job_id(9).as_str());
        seed(&f, 1);

        assert!(f.consumer.run_session(&CancellationToken::new()).await.is_err());
        assert_eq!(f.classifier.calls(), 0);

        f.store
            .insert(job_id(9), "late.png", encoded_image(10, 10, ImageFormat::Png));
        let end = f.consumer.run_session(&CancellationToken::new()).await.unwrap();

        assert_eq!(end, SessionEnd::Drained);
        assert_eq!(f.queue.acked().len(), 2);
        assert_eq!(f.queue.sessions(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_ack() {
        let f = fixture(FakeClassifier::returning(vec![0.25; 4]));
        f.queue.publish("not-an-object-id");

        let err = f
            .consumer
            .run_session(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            ConsumerError::Job(JobError {
                stage: Stage::Receive,
                source: PipelineError::InvalidJob(_),
                ..
            })
        ));
        assert!(f.queue.acked().is_empty());
        assert_eq!(f.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn index_mismatch_is_fatal() {
        let f = fixture(FakeClassifier::returning(vec![0.2; 5]));
        seed(&f, 1);

        let err = f
            .consumer
            .run_session(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(f.queue.acked().is_empty());
        assert_eq!(*f.metrics.outcomes.lock().unwrap(), vec![JobOutcome::Fatal]);
    }

    #[tokio::test]
    async fn canceled_session_takes_nothing() {
        let f = fixture(FakeClassifier::returning(vec![0.25; 4]));
        seed(&f, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = f.consumer.run_session(&cancel).await.unwrap();

        assert_eq!(end, SessionEnd::Canceled);
        assert_eq!(f.queue.ready(), 1);
        assert_eq!(f.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_queue_is_a_queue_error() {
        let f = fixture(FakeClassifier::returning(vec![0.25; 4]));
        f.queue.set_unavailable(true);

        let err = f
            .consumer
            .run_session(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsumerError::Queue(QueueError::Connectivity(_))));
    }
}
