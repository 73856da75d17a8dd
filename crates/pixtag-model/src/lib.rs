mod domain;
pub use domain::{
    JOB_ID_LEN, JobId, LabelEntry, LabelIndex, METADATA_PREDICTIONS, Metadata, Prediction,
    PredictionMap, ScoreVector, TimeoutMs, prediction_key, prediction_percentage_key,
};

mod error;
pub use error::{ModelError, ModelResult};

pub mod config;
pub use config::WorkerConfig;

mod strategy;
pub use strategy::{BackoffStrategy, JitterStrategy, RestartStrategy};
