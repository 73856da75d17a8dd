//! Worker configuration.
//!
//! Everything the worker needs is read once at startup into an immutable [`WorkerConfig`]
//! and handed to component constructors; no component reads the environment on its own.
mod source;
pub use source::EnvSource;

mod queue;
pub use queue::QueueConfig;

mod store;
pub use store::{StoreConfig, StoreConnection};

mod inference;
pub use inference::InferenceConfig;

mod worker;
pub use worker::{ConsumerConfig, NormalizeConfig, WorkerConfig};
