mod job;
pub use job::{JOB_ID_LEN, JobId};

mod metadata;
pub use metadata::Metadata;

mod labels;
pub use labels::{LabelEntry, LabelIndex};

mod scores;
pub use scores::{Prediction, PredictionMap, ScoreVector};

mod constants;
pub use constants::{METADATA_PREDICTIONS, prediction_key, prediction_percentage_key};

/// Timeout value in milliseconds.
///
/// Used by configuration wherever an explicit time limit is applied to a blocking call.
pub type TimeoutMs = u64;
