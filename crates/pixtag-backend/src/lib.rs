mod error;
pub use error::{BackendError, BackendResult};

#[cfg(feature = "amqp")]
pub mod amqp;

#[cfg(feature = "gridfs")]
pub mod gridfs;

#[cfg(feature = "serving")]
pub mod serving;
