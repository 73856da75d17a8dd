use tracing::debug;

use crate::queue::{Delivery, QueueResult};

/// Scoped ownership of a delivery.
///
/// [`complete`](Self::complete) is the only path to an acknowledgment.
/// Dropping the guard leaves the delivery unacknowledged for the broker to redeliver.
#[derive(Debug)]
pub struct DeliveryGuard {
    delivery: Option<Delivery>,
}

impl DeliveryGuard {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            delivery: Some(delivery),
        }
    }

    pub fn body(&self) -> &[u8] {
        self.delivery.as_ref().map(Delivery::body).unwrap_or_default()
    }

    pub fn tag(&self) -> u64 {
        self.delivery.as_ref().map(Delivery::tag).unwrap_or_default()
    }

    pub fn redelivered(&self) -> bool {
        self.delivery.as_ref().is_some_and(Delivery::redelivered)
    }

    /// Acknowledge the delivery, consuming the guard.
    pub async fn complete(mut self) -> QueueResult<()> {
        match self.delivery.take() {
            Some(delivery) => delivery.acker.ack().await,
            None => Ok(()),
        }
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if let Some(delivery) = &self.delivery {
            debug!(tag = delivery.tag, "delivery released without acknowledgment");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::queue::Acker;

    struct CountingAcker(Arc<AtomicUsize>);

    #[async_trait]
    impl Acker for CountingAcker {
        async fn ack(&self) -> QueueResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn guard(acks: &Arc<AtomicUsize>) -> DeliveryGuard {
        DeliveryGuard::new(Delivery::new(
            7,
            b"body".to_vec(),
            false,
            Box::new(CountingAcker(Arc::clone(acks))),
        ))
    }

    #[tokio::test]
    async fn complete_acknowledges_once() {
        let acks = Arc::new(AtomicUsize::new(0));
        let g = guard(&acks);
        assert_eq!(g.body(), b"body");
        assert_eq!(g.tag(), 7);

        g.complete().await.unwrap();
        assert_eq!(acks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_does_not_acknowledge() {
        let acks = Arc::new(AtomicUsize::new(0));
        drop(guard(&acks));
        assert_eq!(acks.load(Ordering::SeqCst), 0);
    }
}
