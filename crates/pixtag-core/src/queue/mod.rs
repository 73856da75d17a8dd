//! Queue abstraction driving the consumer.
//!
//! A [`QueueConnector`] opens one session ([`JobSource`]) per consumer run.
//! Deliveries carry an [`Acker`]; the only way to acknowledge is [`DeliveryGuard::complete`].
mod guard;
pub use guard::DeliveryGuard;

#[cfg(any(test, feature = "testing"))]
mod memory;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryQueue;

use std::{fmt, sync::Arc};

use async_trait::async_trait;

pub use crate::error::{QueueError, QueueResult};

/// Acknowledges exactly one delivery.
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> QueueResult<()>;
}

/// One message taken from the queue, not yet acknowledged.
pub struct Delivery {
    tag: u64,
    body: Vec<u8>,
    redelivered: bool,
    acker: Box<dyn Acker>,
}

impl Delivery {
    pub fn new(tag: u64, body: Vec<u8>, redelivered: bool, acker: Box<dyn Acker>) -> Self {
        Self {
            tag,
            body,
            redelivered,
            acker,
        }
    }

    #[inline]
    pub fn tag(&self) -> u64 {
        self.tag
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("tag", &self.tag)
            .field("body_len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// An open consumer session with prefetch 1.
#[async_trait]
pub trait JobSource: Send {
    /// Next delivery; `None` when the source has nothing more to give.
    async fn next(&mut self) -> QueueResult<Option<Delivery>>;

    /// End the session. Unacknowledged deliveries go back to the queue.
    async fn close(&mut self) -> QueueResult<()>;
}

/// Opens consumer sessions.
#[async_trait]
pub trait QueueConnector: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Reachability check used at startup. Declares the queue but never consumes.
    async fn ping(&self) -> QueueResult<()>;

    async fn connect(&self) -> QueueResult<Box<dyn JobSource>>;
}

/// Shared handle to a queue connector.
pub type ConnectorHandle = Arc<dyn QueueConnector>;
