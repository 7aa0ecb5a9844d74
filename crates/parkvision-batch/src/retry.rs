// SPDX-License-Identifier: Apache-2.0
//! Per-job retry wrapper (spec §4.7: "3 attempts, exponential backoff,
//! wraps transient classes").

use std::future::Future;

use parkvision_types::{CoreError, RetryPolicy};
use rand::Rng;

/// Run `compute` (re-invokable; each attempt is a fresh call), retrying
/// while the error is transient and the policy still allows another
/// attempt. Terminal errors (`ValidationError`, `NotFoundError`, ...)
/// return on the first occurrence.
pub async fn with_retry<F, Fut>(retry_policy: &RetryPolicy, mut compute: F) -> Result<parkvision_types::AnalysisArtifact, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<parkvision_types::AnalysisArtifact, CoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match compute().await {
            Ok(artifact) => return Ok(artifact),
            Err(err) if err.is_transient() && retry_policy.should_retry(attempt) => {
                let jitter_unit = rand::thread_rng().gen_range(-1.0..=1.0);
                tokio::time::sleep(retry_policy.delay_for(attempt, jitter_unit)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
