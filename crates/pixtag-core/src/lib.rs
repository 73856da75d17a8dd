pub mod classify;
pub mod consumer;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod supervisor;
pub mod tagger;

#[cfg(test)]
pub(crate) mod testing;

pub use metrics::{JobOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};

pub mod prelude {
    pub use crate::classify::Classifier;
    pub use crate::consumer::Consumer;
    pub use crate::error::{ConsumerError, JobError, PipelineError, QueueError, StoreError};
    pub use crate::labels::{LabelMapper, load_label_index};
    pub use crate::normalize::ImageNormalizer;
    pub use crate::pipeline::{JobPipeline, JobState, Stage};
    pub use crate::queue::{DeliveryGuard, JobSource, QueueConnector};
    pub use crate::store::ContentStore;
    pub use crate::tagger::MetadataTagger;
}
