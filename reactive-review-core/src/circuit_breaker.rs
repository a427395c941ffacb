//! `CircuitBreaker` (C6): a three-state gate in front of parallel execution.
//! One breaker is shared process-wide across all sessions rather than one
//! per plan or session, so a run of failures anywhere trips protection for
//! everyone currently executing.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerStateSnapshot {
    pub state: BreakerState,
    pub fallback_active: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout: Duration,
    fallback_to_sequential: bool,
}

impl CircuitBreaker {
    pub fn new(
        failure_threshold: u32,
        success_threshold: u32,
        reset_timeout: Duration,
        fallback_to_sequential: bool,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            reset_timeout,
            fallback_to_sequential,
        }
    }

    /// Whether parallel execution may proceed right now. Transitions
    /// `open -> half-open` as a side effect once `reset_timeout` elapses.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.consecutive_successes = 0;
                    debug!("circuit breaker: open -> half-open");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.consecutive_failures = 0;
        match inner.state {
            BreakerState::Closed => {}
            BreakerState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.success_threshold {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                    info!("circuit breaker: half-open -> closed");
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.consecutive_successes = 0;
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    info!("circuit breaker: closed -> open");
                }
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                info!("circuit breaker: half-open -> open");
            }
            BreakerState::Open => {}
        }
    }

    pub fn state(&self) -> BreakerStateSnapshot {
        let inner = self.inner.lock().expect("circuit breaker lock poisoned");
        BreakerStateSnapshot {
            state: inner.state,
            fallback_active: inner.state == BreakerState::Open && self.fallback_to_sequential,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
        }
    }

    pub fn fallback_to_sequential(&self) -> bool {
        self.fallback_to_sequential
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(3, 2, Duration::from_millis(100), true);
        assert!(cb.allow());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state().state, BreakerState::Closed);
        cb.record_failure();
        let snap = cb.state();
        assert_eq!(snap.state, BreakerState::Open);
        assert!(snap.fallback_active);
        assert!(!cb.allow());
    }

    #[test]
    fn failure_threshold_of_one_opens_immediately() {
        let cb = CircuitBreaker::new(1, 2, Duration::from_secs(60), false);
        cb.record_failure();
        assert_eq!(cb.state().state, BreakerState::Open);
    }

    #[tokio::test]
    async fn recovers_through_half_open_to_closed() {
        let cb = CircuitBreaker::new(3, 2, Duration::from_millis(100), true);
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state().state, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cb.allow());
        assert_eq!(cb.state().state, BreakerState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state().state, BreakerState::HalfOpen);
        cb.record_success();
        let snap = cb.state();
        assert_eq!(snap.state, BreakerState::Closed);
        assert!(!snap.fallback_active);
    }

    #[tokio::test]
    async fn any_failure_in_half_open_reopens() {
        let cb = CircuitBreaker::new(1, 2, Duration::from_millis(10), true);
        cb.record_failure();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cb.allow());
        assert_eq!(cb.state().state, BreakerState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state().state, BreakerState::Open);
    }
}
