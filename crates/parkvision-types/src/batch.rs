// SPDX-License-Identifier: Apache-2.0
//! `E:BatchJob` and per-item results (spec §3, §4.7).

use crate::artifact::AnalysisArtifact;
use crate::cache_key::Kind;
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};

/// Per-item error record (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemError {
    /// Stable error code.
    pub error_code: ErrorCode,
    /// Human-readable message.
    pub error_message: String,
    /// Optional hint for whether/when the client should retry.
    pub retry_hint: Option<String>,
}

/// The outcome of one `(image_hash, kind)` job within a batch (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// Source image hash.
    pub image_hash: String,
    /// Analysis kind requested.
    pub kind: Kind,
    /// `Ok` artifact, or `Err` details — never both.
    pub outcome: Result<AnalysisArtifact, BatchItemError>,
    /// Whether this result was served from cache rather than freshly computed.
    pub from_cache: bool,
}

/// Aggregate counts for a completed (or partially completed) batch (spec §4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total `(image, kind)` pairs scheduled.
    pub total: u32,
    /// Count that completed successfully.
    pub success: u32,
    /// Count that failed terminally.
    pub failed: u32,
    /// Count of successes that followed at least one retry.
    pub partial_success_count: u32,
    /// Count served from cache.
    pub cache_hit_count: u32,
    /// Wall-clock processing time for the whole batch.
    pub processing_time_ms: u64,
}

impl BatchSummary {
    /// Whether `success + failed == total` (spec §8 property 10).
    pub fn is_consistent(&self) -> bool {
        self.success + self.failed <= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_through_json() {
        let err = BatchItemError {
            error_code: ErrorCode::NotFoundError,
            error_message: "missing".into(),
            retry_hint: None,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("NOT_FOUND_ERROR"));
        let back: BatchItemError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error_code, ErrorCode::NotFoundError);
    }

    #[test]
    fn summary_partial_failure_is_consistent() {
        let summary = BatchSummary {
            total: 3,
            success: 2,
            failed: 1,
            partial_success_count: 0,
            cache_hit_count: 0,
            processing_time_ms: 10,
        };
        assert!(summary.is_consistent());
    }
}
