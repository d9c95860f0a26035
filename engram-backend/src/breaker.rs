//! Process-wide circuit breaker guarding every backend operation.
//!
//! Closed → Open after `failure_threshold` consecutive failures; Open
//! rejects calls until `timeout` elapses, then Half-Open probes recovery;
//! `success_threshold` consecutive successes close it again.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use engram_core::constants;
use engram_core::errors::BackendError;
use engram_core::models::{BreakerSnapshot, CircuitState};
use engram_core::time::now_ms;

/// Breaker thresholds and recovery timeout.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: constants::BREAKER_FAILURE_THRESHOLD,
            timeout: Duration::from_secs(constants::BREAKER_TIMEOUT_SECS),
            success_threshold: constants::BREAKER_SUCCESS_THRESHOLD,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    last_failure_ms: Option<i64>,
}

/// Three-state circuit breaker. All transitions happen under one mutex so
/// concurrent callers observe a consistent state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
                last_failure_ms: None,
            }),
        }
    }

    /// Admission check. Open circuits reject immediately with the seconds
    /// remaining until the next probe; an expired open circuit flips to
    /// half-open and admits the call.
    pub fn check(&self) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }
        let elapsed = inner
            .last_failure
            .map(|t| t.elapsed())
            .unwrap_or(Duration::MAX);
        if elapsed >= self.config.timeout {
            tracing::info!("circuit breaker: transitioning to half-open");
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            Ok(())
        } else {
            let retry_in = self.config.timeout.saturating_sub(elapsed);
            Err(BackendError::CircuitOpen {
                retry_in_secs: retry_in.as_secs(),
            })
        }
    }

    /// Record a successful operation.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!("circuit breaker: transitioning to closed");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed operation.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        inner.last_failure_ms = Some(now_ms());

        match inner.state {
            CircuitState::HalfOpen => {
                tracing::warn!("circuit breaker: failure in half-open, reopening");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    tracing::error!(
                        failures = inner.failure_count,
                        "circuit breaker: threshold exceeded, opening circuit"
                    );
                    inner.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Manually reset to closed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure = None;
        inner.last_failure_ms = None;
        tracing::info!("circuit breaker: manually reset to closed");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_at: inner.last_failure_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // Counters stay usable even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: 5,
            timeout,
            success_threshold: 2,
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let b = breaker(Duration::from_secs(60));
        for _ in 0..4 {
            b.record_failure();
            assert_eq!(b.snapshot().state, CircuitState::Closed);
        }
        b.record_failure();
        assert_eq!(b.snapshot().state, CircuitState::Open);

        let err = b.check().unwrap_err();
        assert!(matches!(err, BackendError::CircuitOpen { .. }));
    }

    #[test]
    fn success_resets_closed_failure_count() {
        let b = breaker(Duration::from_secs(60));
        for _ in 0..4 {
            b.record_failure();
        }
        b.record_success();
        assert_eq!(b.snapshot().failure_count, 0);
        b.record_failure();
        assert_eq!(b.snapshot().state, CircuitState::Closed);
    }

    #[test]
    fn half_open_closes_after_two_successes() {
        let b = breaker(Duration::from_millis(0));
        for _ in 0..5 {
            b.record_failure();
        }
        assert_eq!(b.snapshot().state, CircuitState::Open);

        // Zero timeout: the next admission check flips to half-open.
        b.check().unwrap();
        assert_eq!(b.snapshot().state, CircuitState::HalfOpen);

        b.record_success();
        assert_eq!(b.snapshot().state, CircuitState::HalfOpen);
        b.record_success();
        assert_eq!(b.snapshot().state, CircuitState::Closed);
        assert_eq!(b.snapshot().failure_count, 0);
    }

    #[test]
    fn half_open_failure_reopens() {
        let b = breaker(Duration::from_millis(0));
        for _ in 0..5 {
            b.record_failure();
        }
        b.check().unwrap();
        b.record_failure();
        assert_eq!(b.snapshot().state, CircuitState::Open);
    }

    #[test]
    fn reset_returns_to_closed() {
        let b = breaker(Duration::from_secs(60));
        for _ in 0..5 {
            b.record_failure();
        }
        b.reset();
        assert_eq!(b.snapshot().state, CircuitState::Closed);
        assert!(b.check().is_ok());
    }
}
