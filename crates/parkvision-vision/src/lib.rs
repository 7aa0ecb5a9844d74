// SPDX-License-Identifier: Apache-2.0
//! Vision-provider client wrapper (spec §4.3).
//!
//! [`VisionClient`] wraps an upstream [`RawVisionProvider`] with retry +
//! backoff and a per-instance [`circuit::CircuitBreaker`]. When the circuit
//! is open, callers get [`VisionError::ServiceUnavailable`] immediately —
//! they never block waiting on an upstream call.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions
)]

mod circuit;
mod http_provider;

pub use circuit::CircuitBreaker;
pub use http_provider::HttpVisionProvider;

use std::time::{SystemTime, UNIX_EPOCH};

use parkvision_types::{CircuitBreakerConfig, PrimitiveBundle, RetryPolicy, VisionFeature};
use rand::Rng;

/// Errors surfaced by [`VisionClient::annotate`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum VisionError {
    /// The circuit is open; the caller should back off rather than retry
    /// immediately.
    #[error("vision service unavailable, retry after {retry_after_seconds}s")]
    ServiceUnavailable {
        /// Seconds until a half-open probe will be allowed.
        retry_after_seconds: u64,
    },
    /// Upstream returned a transient failure class after exhausting retries.
    #[error("vision provider error: {message}")]
    Transient {
        /// Explanation of the failure.
        message: String,
    },
    /// Upstream returned a non-retryable failure.
    #[error("vision provider error: {message}")]
    Terminal {
        /// Explanation of the failure.
        message: String,
    },
}

/// The raw upstream transport — one HTTP/gRPC call per [`VisionClient::annotate`]
/// attempt. Implementations should classify transport/5xx failures as
/// [`VisionError::Transient`] so the client's retry loop engages.
#[async_trait::async_trait]
pub trait RawVisionProvider: Send + Sync {
    /// Call the upstream provider once, batching `features` into a single
    /// request when the provider supports it (spec §4.3: halves quota cost).
    async fn call(&self, bytes: &[u8], features: &[VisionFeature]) -> Result<PrimitiveBundle, VisionError>;
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Retrying, circuit-breaking vision client.
pub struct VisionClient<P> {
    provider: P,
    retry_policy: RetryPolicy,
    breaker: CircuitBreaker,
}

impl<P: RawVisionProvider> VisionClient<P> {
    /// Construct a client with the spec §4.3 defaults (5 failures / 60s
    /// recovery breaker, §4.2-shaped retry).
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retry_policy: RetryPolicy::default(),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        }
    }

    /// Construct a client with custom retry/breaker policies.
    pub fn with_policies(
        provider: P,
        retry_policy: RetryPolicy,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            provider,
            retry_policy,
            breaker: CircuitBreaker::new(breaker_config),
        }
    }

    /// Call the vision provider for `features`, with retry on transient
    /// failures and circuit-breaker short-circuiting.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::ServiceUnavailable`] immediately if the
    /// circuit is open. Returns [`VisionError::Transient`] if every retry
    /// attempt also failed transiently, or [`VisionError::Terminal`] on a
    /// non-retryable upstream failure.
    pub async fn annotate(
        &self,
        bytes: &[u8],
        features: &[VisionFeature],
    ) -> Result<PrimitiveBundle, VisionError> {
        let now = now_unix_ms();
        self.breaker
            .try_acquire(now)
            .map_err(|retry_after_seconds| VisionError::ServiceUnavailable { retry_after_seconds })?;

        let mut attempt = 1;
        loop {
            match self.provider.call(bytes, features).await {
                Ok(bundle) => {
                    self.breaker.on_success();
                    return Ok(bundle);
                }
                Err(VisionError::Transient { message }) if self.retry_policy.should_retry(attempt) => {
                    let jitter_unit = rand::thread_rng().gen_range(-1.0..=1.0);
                    let delay = self.retry_policy.delay_for(attempt, jitter_unit);
                    tracing::warn!(attempt, message, ?delay, "transient vision error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.breaker.on_failure(now_unix_ms());
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyProvider {
        calls: Arc<AtomicU32>,
        fail_first_n: u32,
    }

    #[async_trait::async_trait]
    impl RawVisionProvider for FlakyProvider {
        async fn call(&self, _bytes: &[u8], _features: &[VisionFeature]) -> Result<PrimitiveBundle, VisionError> {
            let call_number = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call_number <= self.fail_first_n {
                Err(VisionError::Transient {
                    message: "5xx".into(),
                })
            } else {
                Ok(PrimitiveBundle::default())
            }
        }
    }

    struct AlwaysTerminal;

    #[async_trait::async_trait]
    impl RawVisionProvider for AlwaysTerminal {
        async fn call(&self, _bytes: &[u8], _features: &[VisionFeature]) -> Result<PrimitiveBundle, VisionError> {
            Err(VisionError::Terminal {
                message: "bad request".into(),
            })
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = VisionClient::new(FlakyProvider {
            calls: calls.clone(),
            fail_first_n: 2,
        });
        let result = client.annotate(b"x", &[VisionFeature::Label]).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_does_not_retry() {
        let client = VisionClient::new(AlwaysTerminal);
        let result = client.annotate(b"x", &[VisionFeature::Label]).await;
        assert!(matches!(result, Err(VisionError::Terminal { .. })));
    }

    #[tokio::test]
    async fn open_circuit_short_circuits_without_calling_provider() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = VisionClient::with_policies(
            FlakyProvider {
                calls: calls.clone(),
                fail_first_n: u32::MAX,
            },
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_seconds: 60,
            },
        );
        let first = client.annotate(b"x", &[VisionFeature::Label]).await;
        assert!(first.is_err());
        let second = client.annotate(b"x", &[VisionFeature::Label]).await;
        assert!(matches!(second, Err(VisionError::ServiceUnavailable { .. })));
    }
}
