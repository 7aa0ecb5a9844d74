// SPDX-License-Identifier: Apache-2.0
//! Batch orchestrator (spec §4.7): one logical job per `(image, kind)`
//! pair, a bounded worker pool, per-job `GetOrCompute` (so duplicate work
//! across the batch collapses into a single computation), per-job retry
//! for transient errors, and cooperative cancellation.
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

mod request;
mod retry;

pub use request::{BatchRequest, BatchResult};

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parkvision_cache::ResultCache;
use parkvision_types::{
    param_fingerprint, BatchItemError, BatchItemResult, BatchSummary, CacheKey, CoreError, Kind,
    RetryPolicy,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default worker pool size (spec §4.7): `min(32, 4 * num_cpus)`.
pub fn default_concurrency_limit() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (4 * cpus).min(32)
}

struct JobOutcome {
    index: usize,
    image_hash: String,
    kind: Kind,
    outcome: Result<(parkvision_types::AnalysisArtifact, bool), CoreError>,
    retried: bool,
}

/// Run a batch (spec §4.7 `BatchAnalyze`).
///
/// `compute(image_hash, kind)` performs the actual (uncached, unretried)
/// analysis for one job; the orchestrator wraps it with the cache's
/// single-flight `GetOrCompute` and a per-job retry policy.
pub async fn batch_analyze<F, Fut>(
    cache: Arc<ResultCache>,
    request: BatchRequest,
    cancel: CancellationToken,
    now_unix_ms: u64,
    compute: F,
) -> BatchResult
where
    F: Fn(String, Kind) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<parkvision_types::AnalysisArtifact, CoreError>> + Send + 'static,
{
    let started = Instant::now();
    let limit = request.concurrency_limit.unwrap_or_else(default_concurrency_limit).max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let compute = Arc::new(compute);
    let retry_policy = RetryPolicy::batch_default();
    let params_json = Arc::new(request.params_json.clone());

    let jobs: Vec<(usize, String, Kind)> = request
        .image_hashes
        .iter()
        .flat_map(|image_hash| {
            request
                .kinds
                .iter()
                .map(move |kind| (image_hash.clone(), *kind))
        })
        .enumerate()
        .map(|(index, (image_hash, kind))| (index, image_hash, kind))
        .collect();
    let total = jobs.len();

    let mut join_set: JoinSet<JobOutcome> = JoinSet::new();
    let mut cancelled_early = false;

    for (index, image_hash, kind) in jobs {
        if cancel.is_cancelled() {
            cancelled_early = true;
            break;
        }
        let semaphore = Arc::clone(&semaphore);
        let cache = Arc::clone(&cache);
        let compute = Arc::clone(&compute);
        let cancel = cancel.clone();
        let params_json = Arc::clone(&params_json);

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::warn!(%image_hash, ?kind, "batch worker pool closed before job ran");
                return JobOutcome {
                    index,
                    image_hash,
                    kind,
                    outcome: Err(CoreError::Processing {
                        operation: "batch_job".to_owned(),
                        context: "worker pool closed".to_owned(),
                    }),
                    retried: false,
                };
            };
            if cancel.is_cancelled() {
                return JobOutcome {
                    index,
                    image_hash,
                    kind,
                    outcome: Err(CoreError::ServiceUnavailable {
                        message: "batch cancelled".to_owned(),
                        retry_after_seconds: 0,
                    }),
                    retried: false,
                };
            }

            let attempts = Arc::new(AtomicU32::new(0));
            let version = cache.current_version(kind);
            let fingerprint = param_fingerprint(params_json.as_ref());
            let key = CacheKey::new(kind, version, image_hash.clone(), fingerprint);
            let ttl_seconds = kind.default_ttl_seconds();

            let job_image_hash = image_hash.clone();
            let attempts_for_closure = Arc::clone(&attempts);
            let outcome = cache
                .get_or_compute(&key, ttl_seconds, (*params_json).clone(), now_unix_ms, move || {
                    let compute = Arc::clone(&compute);
                    let image_hash = job_image_hash;
                    let attempts = attempts_for_closure;
                    async move {
                        retry::with_retry(&retry_policy, || {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            compute(image_hash.clone(), kind)
                        })
                        .await
                    }
                })
                .await;

            JobOutcome {
                index,
                image_hash,
                kind,
                outcome,
                retried: attempts.load(Ordering::SeqCst) > 1,
            }
        });
    }

    let mut items: Vec<Option<BatchItemResult>> = (0..total).map(|_| None).collect();
    let mut success = 0u32;
    let mut failed = 0u32;
    let mut partial_success_count = 0u32;
    let mut cache_hit_count = 0u32;

    while let Some(joined) = join_set.join_next().await {
        let Ok(job) = joined else {
            continue;
        };
        let item = match job.outcome {
            Ok((artifact, from_cache)) => {
                success += 1;
                if from_cache {
                    cache_hit_count += 1;
                }
                if job.retried {
                    partial_success_count += 1;
                }
                BatchItemResult {
                    image_hash: job.image_hash,
                    kind: job.kind,
                    outcome: Ok(artifact),
                    from_cache,
                }
            }
            Err(err) => {
                failed += 1;
                BatchItemResult {
                    image_hash: job.image_hash,
                    kind: job.kind,
                    outcome: Err(BatchItemError {
                        error_code: err.code(),
                        error_message: err.to_string(),
                        retry_hint: err.retry_after_seconds().map(|s| format!("retry after {s}s")),
                    }),
                    from_cache: false,
                }
            }
        };
        items[job.index] = Some(item);
    }

    let partial = cancelled_early || items.iter().any(Option::is_none);
    let items: Vec<BatchItemResult> = items.into_iter().flatten().collect();

    BatchResult {
        summary: BatchSummary {
            total: total as u32,
            success,
            failed,
            partial_success_count,
            cache_hit_count,
            processing_time_ms: started.elapsed().as_millis() as u64,
        },
        items,
        partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::{AnalysisArtifact, DetectionArtifact};

    fn artifact() -> AnalysisArtifact {
        AnalysisArtifact::Detect(DetectionArtifact { detections: vec![] })
    }

    #[tokio::test]
    async fn duplicate_jobs_collapse_via_cache() {
        let cache = Arc::new(ResultCache::new());
        let calls = Arc::new(AtomicU32::new(0));
        let request = BatchRequest {
            image_hashes: vec!["a".repeat(32), "a".repeat(32)],
            kinds: vec![Kind::Detect],
            params_json: serde_json::Value::Null,
            concurrency_limit: Some(4),
        };
        let calls_for_compute = Arc::clone(&calls);
        let result = batch_analyze(cache, request, CancellationToken::new(), 0, move |_hash, _kind| {
            calls_for_compute.fetch_add(1, Ordering::SeqCst);
            async { Ok(artifact()) }
        })
        .await;

        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.success, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn per_job_failure_is_isolated() {
        let cache = Arc::new(ResultCache::new());
        let request = BatchRequest {
            image_hashes: vec!["a".repeat(32), "b".repeat(32)],
            kinds: vec![Kind::Detect],
            params_json: serde_json::Value::Null,
            concurrency_limit: Some(4),
        };
        let result = batch_analyze(cache, request, CancellationToken::new(), 0, |hash, _kind| async move {
            if hash == "a".repeat(32) {
                Err(CoreError::Validation { message: "bad".into() })
            } else {
                Ok(artifact())
            }
        })
        .await;

        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.success, 1);
        assert_eq!(result.summary.failed, 1);
        assert!(result.summary.is_consistent());
    }

    #[tokio::test]
    async fn already_cancelled_batch_returns_partial() {
        let cache = Arc::new(ResultCache::new());
        let request = BatchRequest {
            image_hashes: vec!["a".repeat(32)],
            kinds: vec![Kind::Detect],
            params_json: serde_json::Value::Null,
            concurrency_limit: Some(4),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = batch_analyze(cache, request, cancel, 0, |_hash, _kind| async { Ok(artifact()) }).await;
        assert!(result.partial);
    }
}
