// SPDX-License-Identifier: Apache-2.0
//! Stampede suppression (spec §4.4 "Stampede suppression (single-flight)").
//!
//! Concurrent `GetOrCompute` calls for the same key share one computation.
//! The computation itself is spawned onto its own task so that a waiter
//! timing out (or its caller cancelling) does not abort the in-flight work —
//! the result may still land in the cache for later callers, per spec.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parkvision_types::AnalysisArtifact;
use tokio::sync::broadcast;

type ComputeResult = Result<AnalysisArtifact, String>;

/// Errors from a [`SingleFlight::get_or_compute`] call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFlightError {
    /// The shared computation failed; the message is the original error's
    /// `Display` text (not cached — the next caller retries).
    #[error("computation failed: {0}")]
    Computation(String),
    /// `single_flight_timeout` elapsed before the result arrived. The
    /// computation itself keeps running.
    #[error("timed out waiting for in-flight computation")]
    Timeout,
}

/// Per-key computation broadcast registry.
pub struct SingleFlight {
    inflight: Arc<DashMap<String, broadcast::Sender<ComputeResult>>>,
}

impl SingleFlight {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Number of computations currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Run `compute` at most once per distinct `key` among concurrent
    /// callers; all callers for that key receive the same result.
    ///
    /// # Errors
    ///
    /// Returns [`SingleFlightError::Timeout`] if `timeout` elapses before a
    /// result is available. Returns [`SingleFlightError::Computation`] if
    /// the shared computation itself failed.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        timeout: Duration,
        compute: F,
    ) -> Result<AnalysisArtifact, SingleFlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ComputeResult> + Send + 'static,
    {
        let mut became_leader = false;
        let sender = self
            .inflight
            .entry(key.to_owned())
            .or_insert_with(|| {
                became_leader = true;
                broadcast::channel(16).0
            })
            .clone();

        if became_leader {
            let inflight = Arc::clone(&self.inflight);
            let key_owned = key.to_owned();
            let sender_for_task = sender.clone();
            let compute_future = compute();
            tokio::spawn(async move {
                let result = compute_future.await;
                let _ignored_if_no_receivers = sender_for_task.send(result);
                inflight.remove(&key_owned);
            });
        }

        let mut receiver = sender.subscribe();
        drop(sender);

        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Ok(Ok(artifact))) => Ok(artifact),
            Ok(Ok(Err(message))) => Err(SingleFlightError::Computation(message)),
            Ok(Err(_recv_closed)) => Err(SingleFlightError::Computation(
                "in-flight computation ended without a result".to_owned(),
            )),
            Err(_elapsed) => Err(SingleFlightError::Timeout),
        }
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::{AnalysisArtifact, DetectionArtifact};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn artifact() -> AnalysisArtifact {
        AnalysisArtifact::Detect(DetectionArtifact { detections: vec![] })
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flight
                    .get_or_compute("key-a", Duration::from_secs(5), move || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(artifact())
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn computation_error_is_propagated_and_not_retained() {
        let flight = SingleFlight::new();
        let result = flight
            .get_or_compute("key-b", Duration::from_secs(5), || async {
                Err("boom".to_owned())
            })
            .await;
        assert!(matches!(result, Err(SingleFlightError::Computation(_))));
        assert_eq!(flight.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn waiter_times_out_while_computation_continues() {
        let flight = SingleFlight::new();
        let result = flight
            .get_or_compute("key-c", Duration::from_millis(10), || async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(artifact())
            })
            .await;
        assert!(matches!(result, Err(SingleFlightError::Timeout)));
    }
}
