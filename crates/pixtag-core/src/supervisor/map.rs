//! Model strategies to taskvisor policies.
use std::time::Duration;

use pixtag_model::{BackoffStrategy, JitterStrategy, RestartStrategy};
use taskvisor::{BackoffPolicy, JitterPolicy, RestartPolicy};

pub fn to_restart_policy(s: RestartStrategy) -> RestartPolicy {
    match s {
        RestartStrategy::OnFailure => RestartPolicy::OnFailure,
        RestartStrategy::Always => RestartPolicy::Always { interval: None },
        RestartStrategy::Never => RestartPolicy::Never,
    }
}

pub fn to_jitter_policy(s: JitterStrategy) -> JitterPolicy {
    match s {
        JitterStrategy::None => JitterPolicy::None,
        JitterStrategy::Full => JitterPolicy::Full,
        JitterStrategy::Equal => JitterPolicy::Equal,
        JitterStrategy::Decorrelated => JitterPolicy::Decorrelated,
    }
}

/// Session restarts have no success delay: a drained session ends the task.
pub fn to_backoff_policy(s: &BackoffStrategy) -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_millis(s.first_ms),
        max: Duration::from_millis(s.max_ms),
        jitter: to_jitter_policy(s.jitter),
        factor: s.factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_durations_are_milliseconds() {
        let policy = to_backoff_policy(&BackoffStrategy {
            jitter: JitterStrategy::Equal,
            first_ms: 250,
            max_ms: 8_000,
            factor: 3.0,
        });
        assert_eq!(policy.first, Duration::from_millis(250));
        assert_eq!(policy.max, Duration::from_millis(8_000));
        assert_eq!(policy.factor, 3.0);
        assert!(policy.success_delay.is_none());
        assert!(matches!(policy.jitter, JitterPolicy::Equal));
    }

    #[test]
    fn restart_strategies_map_one_to_one() {
        assert!(matches!(
            to_restart_policy(RestartStrategy::OnFailure),
            RestartPolicy::OnFailure
        ));
        assert!(matches!(
            to_restart_policy(RestartStrategy::Never),
            RestartPolicy::Never
        ));
        assert!(matches!(
            to_restart_policy(RestartStrategy::Always),
            RestartPolicy::Always
        ));
    }
}
