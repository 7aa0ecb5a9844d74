// SPDX-License-Identifier: Apache-2.0
//! Shared retry/backoff policy (spec §4.2, §4.3, §4.7) and circuit-breaker
//! state machine (spec §4.3). Pure data and arithmetic — the actual
//! sleep/await loop lives in each caller (`parkvision-blobstore`,
//! `parkvision-vision`, `parkvision-batch`) since they differ in what they
//! retry and how transience is detected.

use std::time::Duration;

/// Exponential backoff with jitter (spec §4.2 defaults: 200ms base, factor
/// 2, ±25% jitter, 5 max attempts).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds before the first retry.
    pub base_ms: u64,
    /// Multiplicative factor applied per retry.
    pub factor: f64,
    /// Jitter as a fraction of the computed delay (e.g. `0.25` = ±25%).
    pub jitter_pct: f64,
    /// Hard cap on any single delay.
    pub max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_ms: 200,
            factor: 2.0,
            jitter_pct: 0.25,
            max_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// The per-job batch retry policy (spec §4.7): 3 attempts, same backoff
    /// shape, smaller cap since batch jobs should not monopolize a worker.
    pub fn batch_default() -> Self {
        Self {
            max_attempts: 3,
            base_ms: 200,
            factor: 2.0,
            jitter_pct: 0.25,
            max_ms: 5_000,
        }
    }

    /// Compute the delay before attempt `attempt` (1-based: `attempt == 1`
    /// is the delay before the *first* retry, i.e. after the initial try
    /// failed). `jitter_unit` is a caller-supplied value in `[-1.0, 1.0]`
    /// driving the jitter direction/magnitude, so the policy itself stays
    /// free of a random-number source.
    pub fn delay_for(&self, attempt: u32, jitter_unit: f64) -> Duration {
        let unclamped = self.base_ms as f64 * self.factor.powi(attempt.saturating_sub(1) as i32);
        let base = unclamped.min(self.max_ms as f64);
        let jitter = base * self.jitter_pct * jitter_unit.clamp(-1.0, 1.0);
        let millis = (base + jitter).clamp(0.0, self.max_ms as f64);
        Duration::from_millis(millis as u64)
    }

    /// Whether `attempt` (1-based, the attempt number that just failed)
    /// still has a retry budget remaining.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Circuit-breaker state (spec §4.3): closed → open after
/// `failure_threshold` consecutive failures, recovers to half-open after
/// `recovery_seconds`, and a single half-open trial call decides closed vs.
/// re-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls are short-circuited; no upstream traffic is sent.
    Open,
    /// A single trial call is in flight; all others are still short-circuited.
    HalfOpen,
}

/// Circuit-breaker configuration (spec §4.3 defaults: 5 failures, 60s).
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before tripping to `Open`.
    pub failure_threshold: u32,
    /// Seconds to wait in `Open` before allowing a half-open probe.
    pub recovery_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_before_jitter() {
        let policy = RetryPolicy::default();
        assert!((policy.delay_for(1, 0.0).as_millis() as i64 - 200).abs() <= 1);
        assert!((policy.delay_for(2, 0.0).as_millis() as i64 - 400).abs() <= 1);
        assert!((policy.delay_for(3, 0.0).as_millis() as i64 - 800).abs() <= 1);
    }

    #[test]
    fn delay_is_capped_at_max_ms() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for(10, 1.0);
        assert!(delay.as_millis() as u64 <= policy.max_ms);
    }

    #[test]
    fn jitter_is_bounded_by_jitter_pct() {
        let policy = RetryPolicy::default();
        let base = policy.delay_for(2, 0.0).as_millis() as f64;
        let high = policy.delay_for(2, 1.0).as_millis() as f64;
        let low = policy.delay_for(2, -1.0).as_millis() as f64;
        assert!(high > base && high <= base * (1.0 + policy.jitter_pct) + 1.0);
        assert!(low < base && low >= base * (1.0 - policy.jitter_pct) - 1.0);
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
    }

    #[test]
    fn batch_default_has_three_attempts() {
        assert_eq!(RetryPolicy::batch_default().max_attempts, 3);
    }
}
