use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::queue::{Acker, Delivery, JobSource, QueueConnector, QueueError, QueueResult};

#[derive(Default)]
struct State {
    ready: VecDeque<(Vec<u8>, bool)>,
    unacked: HashMap<u64, Vec<u8>>,
    acked: Vec<Vec<u8>>,
    next_tag: u64,
    sessions: usize,
    unavailable: bool,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local queue with broker-like redelivery.
///
/// Deliveries still unacknowledged when their session closes (or is dropped) return to the
/// front of the queue flagged as redelivered. A session reports `None` once the queue is empty.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Shared,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, body: impl Into<Vec<u8>>) {
        lock(&self.state).ready.push_back((body.into(), false));
    }

    /// Make subsequent `connect` calls fail with [`QueueError::Connectivity`].
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    pub fn ready(&self) -> usize {
        lock(&self.state).ready.len()
    }

    pub fn unacked(&self) -> usize {
        lock(&self.state).unacked.len()
    }

    pub fn acked(&self) -> Vec<Vec<u8>> {
        lock(&self.state).acked.clone()
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> usize {
        lock(&self.state).sessions
    }
}

#[async_trait]
impl QueueConnector for MemoryQueue {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> QueueResult<()> {
        if lock(&self.state).unavailable {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn connect(&self) -> QueueResult<Box<dyn JobSource>> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(unavailable());
        }
        state.sessions += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }
}

fn unavailable() -> QueueError {
    QueueError::Connectivity("memory queue marked unavailable".into())
}

struct MemorySession {
    state: Shared,
    pending: Vec<u64>,
}

impl MemorySession {
    fn requeue_pending(&mut self) {
        let mut state = lock(&self.state);
        for tag in self.pending.drain(..).rev() {
            if let Some(body) = state.unacked.remove(&tag) {
                state.ready.push_front((body, true));
            }
        }
    }
}

#[async_trait]
impl JobSource for MemorySession {
    async fn next(&mut self) -> QueueResult<Option<Delivery>> {
        let mut state = lock(&self.state);
        let Some((body, redelivered)) = state.ready.pop_front() else {
            return Ok(None);
        };
        state.next_tag += 1;
        let tag = state.next_tag;
        state.unacked.insert(tag, body.clone());
        drop(state);

        self.pending.push(tag);
        let acker = MemoryAcker {
            state: Arc::clone(&self.state),
            tag,
        };
        Ok(Some(Delivery::new(tag, body, redelivered, Box::new(acker))))
    }

    async fn close(&mut self) -> QueueResult<()> {
        self.requeue_pending();
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.requeue_pending();
    }
}

struct MemoryAcker {
    state: Shared,
    tag: u64,
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(&self) -> QueueResult<()> {
        let mut state = lock(&self.state);
        let body = state
            .unacked
            .remove(&self.tag)
            .ok_or_else(|| QueueError::Ack(format!("unknown delivery tag {}", self.tag)))?;
        state.acked.push(body);
        Ok(())
    }
}
