// SPDX-License-Identifier: Apache-2.0
//! Per-instance circuit breaker (spec §4.3).
//!
//! State is shared via atomics so reads never take a lock, per spec §5's
//! "Circuit-breaker state in C3 is shared and updated atomically; reads are
//! lock-free" requirement.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parkvision_types::{CircuitBreakerConfig, CircuitState};

/// Lock-free circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    consecutive_failures: AtomicU32,
    state: AtomicU32,
    opened_at_unix_ms: AtomicU64,
    half_open_trial_in_flight: AtomicBool,
}

const STATE_CLOSED: u32 = 0;
const STATE_OPEN: u32 = 1;
const STATE_HALF_OPEN: u32 = 2;

impl CircuitBreaker {
    /// Construct a closed breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            consecutive_failures: AtomicU32::new(0),
            state: AtomicU32::new(STATE_CLOSED),
            opened_at_unix_ms: AtomicU64::new(0),
            half_open_trial_in_flight: AtomicBool::new(false),
        }
    }

    /// Current state, re-evaluating `Open -> HalfOpen` against `now_unix_ms`
    /// without mutating shared state (a pure read may still observe the
    /// transition; the actual transition is committed by
    /// [`try_acquire`](Self::try_acquire)).
    pub fn state(&self, now_unix_ms: u64) -> CircuitState {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => {
                let opened_at = self.opened_at_unix_ms.load(Ordering::Acquire);
                let recovery_ms = self.config.recovery_seconds.saturating_mul(1000);
                if now_unix_ms.saturating_sub(opened_at) >= recovery_ms {
                    CircuitState::HalfOpen
                } else {
                    CircuitState::Open
                }
            }
            STATE_HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Decide whether a call may proceed right now, claiming the single
    /// half-open trial slot if applicable.
    ///
    /// Returns `Ok(())` if the call may proceed. Returns `Err(retry_after_s)`
    /// if the circuit is open and the caller should fail fast.
    pub fn try_acquire(&self, now_unix_ms: u64) -> Result<(), u64> {
        match self.state(now_unix_ms) {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => {
                if self
                    .half_open_trial_in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.state.store(STATE_HALF_OPEN, Ordering::Release);
                    Ok(())
                } else {
                    Err(self.retry_after_seconds(now_unix_ms))
                }
            }
            CircuitState::Open => Err(self.retry_after_seconds(now_unix_ms)),
        }
    }

    /// Seconds until the breaker will allow a half-open probe.
    pub fn retry_after_seconds(&self, now_unix_ms: u64) -> u64 {
        let opened_at = self.opened_at_unix_ms.load(Ordering::Acquire);
        let recovery_ms = self.config.recovery_seconds.saturating_mul(1000);
        let elapsed_ms = now_unix_ms.saturating_sub(opened_at);
        recovery_ms.saturating_sub(elapsed_ms) / 1000
    }

    /// Record a successful call. Closes the circuit (from any state) and
    /// resets the failure counter.
    pub fn on_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.state.store(STATE_CLOSED, Ordering::Release);
        self.half_open_trial_in_flight.store(false, Ordering::Release);
    }

    /// Record a failed call at `now_unix_ms`. Trips the breaker to `Open`
    /// once `failure_threshold` consecutive failures accumulate, or
    /// immediately re-opens on a failed half-open trial.
    pub fn on_failure(&self, now_unix_ms: u64) {
        if self.half_open_trial_in_flight.swap(false, Ordering::AcqRel) {
            self.open(now_unix_ms);
            return;
        }
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.config.failure_threshold {
            self.open(now_unix_ms);
        }
    }

    fn open(&self, now_unix_ms: u64) {
        self.state.store(STATE_OPEN, Ordering::Release);
        self.opened_at_unix_ms.store(now_unix_ms, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_seconds: 60,
        }
    }

    #[test]
    fn closed_allows_calls() {
        let breaker = CircuitBreaker::new(config());
        assert!(breaker.try_acquire(0).is_ok());
    }

    #[test]
    fn trips_open_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config());
        breaker.on_failure(0);
        breaker.on_failure(0);
        assert_eq!(breaker.state(0), CircuitState::Closed);
        breaker.on_failure(0);
        assert_eq!(breaker.state(0), CircuitState::Open);
        assert!(breaker.try_acquire(0).is_err());
    }

    #[test]
    fn recovers_to_half_open_after_recovery_window() {
        let breaker = CircuitBreaker::new(config());
        breaker.on_failure(0);
        breaker.on_failure(0);
        breaker.on_failure(0);
        assert_eq!(breaker.state(61_000), CircuitState::HalfOpen);
        assert!(breaker.try_acquire(61_000).is_ok());
    }

    #[test]
    fn only_one_half_open_trial_at_a_time() {
        let breaker = CircuitBreaker::new(config());
        breaker.on_failure(0);
        breaker.on_failure(0);
        breaker.on_failure(0);
        assert!(breaker.try_acquire(61_000).is_ok());
        assert!(breaker.try_acquire(61_000).is_err());
    }

    #[test]
    fn successful_half_open_trial_closes_circuit() {
        let breaker = CircuitBreaker::new(config());
        breaker.on_failure(0);
        breaker.on_failure(0);
        breaker.on_failure(0);
        assert!(breaker.try_acquire(61_000).is_ok());
        breaker.on_success();
        assert_eq!(breaker.state(61_000), CircuitState::Closed);
        assert!(breaker.try_acquire(61_000).is_ok());
    }

    #[test]
    fn failed_half_open_trial_reopens_immediately() {
        let breaker = CircuitBreaker::new(config());
        breaker.on_failure(0);
        breaker.on_failure(0);
        breaker.on_failure(0);
        assert!(breaker.try_acquire(61_000).is_ok());
        breaker.on_failure(61_000);
        assert_eq!(breaker.state(61_000), CircuitState::Open);
    }
}
