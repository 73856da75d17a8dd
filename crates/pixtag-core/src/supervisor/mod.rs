//! Runs the consumer under a taskvisor supervisor.
//!
//! Each task attempt is one consumer session. Recoverable failures end the attempt with
//! `TaskError::Fail` so the restart policy reconnects after backoff; a fatal failure trips the
//! [`FatalSignal`] and [`supervise`] returns.
mod map;
pub use map::{to_backoff_policy, to_jitter_policy, to_restart_policy};

use std::sync::{Arc, OnceLock};

use pixtag_model::config::ConsumerConfig;
use taskvisor::{Subscribe, Supervisor, SupervisorConfig, TaskError, TaskFn, TaskRef, TaskSpec};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::consumer::{Consumer, SessionEnd};

/// Name of the consumer task in supervisor events.
pub const CONSUMER_TASK_NAME: &str = "pixtag-consumer";

#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("supervisor error: {0}")]
    Supervisor(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

/// One-shot, cloneable fatal condition with its first reason.
#[derive(Debug, Clone, Default)]
pub struct FatalSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl FatalSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reason` (the first one wins) and wake all waiters.
    pub fn trip(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    pub fn is_tripped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Resolves once [`trip`](Self::trip) has been called.
    pub async fn tripped(&self) {
        self.token.cancelled().await
    }
}

/// One consumer session mapped onto a task attempt result.
pub async fn run_attempt(
    consumer: &Consumer,
    cancel: &CancellationToken,
    fatal: &FatalSignal,
) -> Result<(), TaskError> {
    match consumer.run_session(cancel).await {
        Ok(SessionEnd::Drained) => Ok(()),
        Ok(SessionEnd::Canceled) => Err(TaskError::Canceled),
        Err(e) if e.is_fatal() => {
            let reason = e.to_string();
            fatal.trip(reason.clone());
            Err(TaskError::Fatal { reason })
        }
        Err(e) => Err(TaskError::Fail {
            reason: e.to_string(),
        }),
    }
}

/// Task body running one session per attempt.
pub fn consumer_task(consumer: Arc<Consumer>, fatal: FatalSignal) -> TaskRef {
    TaskFn::arc(CONSUMER_TASK_NAME, move |cancel: CancellationToken| {
        let consumer = Arc::clone(&consumer);
        let fatal = fatal.clone();
        async move { run_attempt(&consumer, &cancel, &fatal).await }
    })
}

/// Task spec with restart and backoff from the consumer configuration. Sessions have no timeout.
pub fn consumer_spec(consumer: Arc<Consumer>, cfg: &ConsumerConfig, fatal: FatalSignal) -> TaskSpec {
    TaskSpec::new(
        consumer_task(consumer, fatal),
        to_restart_policy(cfg.restart),
        to_backoff_policy(&cfg.backoff),
        None,
    )
}

/// Run the consumer until shutdown or a fatal failure.
pub async fn supervise(
    consumer: Arc<Consumer>,
    cfg: &ConsumerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
) -> Result<(), SuperviseError> {
    let fatal = FatalSignal::new();
    let sup: Arc<Supervisor> = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();

    let spec = consumer_spec(consumer, cfg, fatal.clone());
    info!(restart = ?cfg.restart, "starting consumer supervisor");

    tokio::select! {
        res = sup.run(vec![spec]) => {
            res.map_err(|e| SuperviseError::Supervisor(e.to_string()))?;
            info!("supervisor stopped");
            Ok(())
        }
        _ = fatal.tripped() => {
            let reason = fatal.reason().unwrap_or("unknown").to_string();
            error!(reason = %reason, "fatal condition, stopping worker");
            Err(SuperviseError::Fatal(reason))
        }
    }
}
