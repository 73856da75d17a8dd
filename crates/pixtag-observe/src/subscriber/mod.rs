#![cfg(feature = "subscriber")]

//! Supervisor event logging.
//!
//! Turns taskvisor lifecycle events into `tracing` records so consumer
//! restarts, backoff and fatal stops show up next to the job logs.

use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

/// Bounded queue size for the subscriber worker; overflow drops events.
const QUEUE_CAPACITY: usize = 1024;

/// Logs every supervisor event through `tracing`.
#[derive(Debug, Default)]
pub struct Subscriber;

#[async_trait]
impl Subscribe for Subscriber {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "pixtag-log"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("-");
    let reason = e.reason.as_deref().unwrap_or("-");
    let attempt = e.attempt.unwrap_or(0);
    let msg = describe(e.kind);

    match e.kind {
        EventKind::TaskAddRequested
        | EventKind::TaskRemoveRequested
        | EventKind::TaskRemoved
        | EventKind::TaskStopped
        | EventKind::ControllerSubmitted => trace!(task, "{msg}"),

        EventKind::TaskAdded | EventKind::ControllerSlotTransition => debug!(task, "{msg}"),
        EventKind::ActorExhausted => debug!(task, reason, "{msg}"),

        EventKind::TaskStarting => info!(task, attempt, "{msg}"),
        EventKind::ShutdownRequested | EventKind::AllStoppedWithinGrace => info!("{msg}"),

        EventKind::BackoffScheduled => {
            let delay_ms = e.delay_ms.unwrap_or(0);
            if e.reason.is_some() {
                warn!(task, attempt, delay_ms, reason, "consumer restart scheduled after failure");
            } else {
                debug!(task, attempt, delay_ms, "{msg}");
            }
        }
        EventKind::TimeoutHit => warn!(task, timeout_ms = e.timeout_ms.unwrap_or(0), "{msg}"),
        EventKind::GraceExceeded => warn!("{msg}"),
        EventKind::ControllerRejected => warn!(task, reason, "{msg}"),

        EventKind::TaskFailed => error!(task, attempt, reason, "{msg}"),
        EventKind::ActorDead | EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
            error!(task, reason, "{msg}")
        }
    }
}

fn describe(kind: EventKind) -> &'static str {
    match kind {
        EventKind::TaskAddRequested => "task add requested",
        EventKind::TaskAdded => "task added",
        EventKind::TaskRemoveRequested => "task removal requested",
        EventKind::TaskRemoved => "task removed",
        EventKind::TaskStarting => "task starting",
        EventKind::TaskStopped => "task stopped",
        EventKind::TaskFailed => "task attempt failed",
        EventKind::TimeoutHit => "task exceeded its timeout",
        EventKind::BackoffScheduled => "next run scheduled",
        EventKind::ActorExhausted => "restart policy exhausted",
        EventKind::ActorDead => "task stopped permanently after a fatal error",
        EventKind::ShutdownRequested => "shutdown requested",
        EventKind::AllStoppedWithinGrace => "all tasks stopped within grace period",
        EventKind::GraceExceeded => "grace period exceeded",
        EventKind::SubscriberOverflow => "subscriber queue overflow, event dropped",
        EventKind::SubscriberPanicked => "subscriber panicked",
        EventKind::ControllerRejected => "controller rejected submission",
        EventKind::ControllerSubmitted => "controller submitted task",
        EventKind::ControllerSlotTransition => "controller slot transition",
    }
}
