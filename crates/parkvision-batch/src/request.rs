// SPDX-License-Identifier: Apache-2.0
//! Batch request/result shapes (spec §4.7).

use parkvision_types::{BatchItemResult, BatchSummary, Kind};

/// `BatchAnalyze` input (spec §4.7).
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Source images, by content hash.
    pub image_hashes: Vec<String>,
    /// Analysis kinds requested for every image.
    pub kinds: Vec<Kind>,
    /// Caller-visible parameters shared by every job (feeds the cache key's
    /// `param_fingerprint`).
    pub params_json: serde_json::Value,
    /// Worker pool size. `None` uses [`crate::default_concurrency_limit`].
    pub concurrency_limit: Option<usize>,
}

/// `BatchAnalyze` output (spec §4.7): results aligned to the input
/// `image_hashes x kinds` Cartesian product, in that order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// One entry per `(image_hash, kind)` pair, in Cartesian-product order.
    pub items: Vec<BatchItemResult>,
    /// Aggregate counts.
    pub summary: BatchSummary,
    /// `true` if cancellation cut the batch short before every job ran.
    pub partial: bool,
}
