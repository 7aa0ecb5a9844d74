// SPDX-License-Identifier: Apache-2.0
//! Tiered result cache (spec §4.4).
//!
//! [`ResultCache`] is the in-process tier described by spec §4.4's "an
//! in-process LRU sits in front for sub-ms reads of hot keys" — it is a
//! complete `ResultCache` on its own for a single-instance deployment, and
//! the natural front tier for a future remote-backed implementation (the
//! fail-open contract on remote I/O is documented on [`ResultCache::get`]
//! for that reason, even though this tier cannot itself fail).
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

mod single_flight;
mod stats;

pub use single_flight::SingleFlightError;
pub use stats::{KindStats, StatsSnapshot};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parkvision_types::{
    AnalysisArtifact, CacheEntryMeta, CacheKey, CoreError, EvictionWeights, Kind,
};

use single_flight::SingleFlight;
use stats::Counters;

/// Default cache byte budget (spec §4.4): 512 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Default single-flight waiter timeout (spec §4.4): 60s.
pub const DEFAULT_SINGLE_FLIGHT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fraction of `max_bytes` eviction targets (spec §4.4: "evict until usage
/// <= 0.8 * max_bytes").
const EVICTION_TARGET_FRACTION: f64 = 0.8;

/// Outcome of [`ResultCache::get`].
#[derive(Debug, Clone)]
pub enum GetResult {
    /// A live entry was found.
    Hit(AnalysisArtifact),
    /// No live entry — either never written, expired, or invalidated by a
    /// version bump.
    Miss,
}

struct StoredEntry {
    meta: CacheEntryMeta,
    artifact: AnalysisArtifact,
}

/// Tiered result cache (spec §4.4).
pub struct ResultCache {
    entries: DashMap<String, StoredEntry>,
    versions: DashMap<Kind, AtomicU64>,
    counters: Counters,
    single_flight: SingleFlight,
    total_bytes: AtomicU64,
    max_bytes: u64,
    eviction_weights: EvictionWeights,
    single_flight_timeout: Duration,
}

impl ResultCache {
    /// Construct a cache with the spec §4.4 defaults.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_BYTES, EvictionWeights::default(), DEFAULT_SINGLE_FLIGHT_TIMEOUT)
    }

    /// Construct a cache with custom budget, eviction weights, and
    /// single-flight timeout.
    pub fn with_config(
        max_bytes: u64,
        eviction_weights: EvictionWeights,
        single_flight_timeout: Duration,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            versions: DashMap::new(),
            counters: Counters::default(),
            single_flight: SingleFlight::new(),
            total_bytes: AtomicU64::new(0),
            max_bytes,
            eviction_weights,
            single_flight_timeout,
        }
    }

    /// The current version counter for `kind` (starts at `0`).
    pub fn current_version(&self, kind: Kind) -> u64 {
        self.versions
            .get(&kind)
            .map_or(0, |v| v.load(Ordering::Acquire))
    }

    /// Bump `kind`'s version counter, invalidating all prior entries of
    /// that kind (spec §4.4 `InvalidateVersion`). Returns the new version.
    pub fn invalidate_version(&self, kind: Kind) -> u64 {
        self.versions
            .entry(kind)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::AcqRel)
            + 1
    }

    /// Seed `kind`'s version counter from a persisted value at startup
    /// (spec §3 `E:VersionCounters`), without treating the restore itself as
    /// an invalidation. Only raises the counter — never lowers it below
    /// whatever this process has already observed.
    pub fn restore_version(&self, kind: Kind, version: u64) {
        self.versions
            .entry(kind)
            .and_modify(|existing| {
                let current = existing.load(Ordering::Acquire);
                if version > current {
                    existing.store(version, Ordering::Release);
                }
            })
            .or_insert_with(|| AtomicU64::new(version));
    }

    /// Look up `key` (spec §4.4 `Get`).
    ///
    /// Returns [`GetResult::Miss`] if the key was never written, has
    /// expired, or its `version` is older than the kind's current version
    /// counter (an `InvalidateVersion` bump makes prior versions
    /// unreachable even if their entries have not yet been reaped).
    pub fn get(&self, key: &CacheKey, now_unix_ms: u64) -> GetResult {
        if key.version < self.current_version(key.kind) {
            self.counters.record_miss(key.kind);
            return GetResult::Miss;
        }

        let encoded = key.encode();
        let Some(mut entry) = self.entries.get_mut(&encoded) else {
            self.counters.record_miss(key.kind);
            return GetResult::Miss;
        };

        if !entry.meta.is_live_at(now_unix_ms) {
            drop(entry);
            if let Some((_, removed)) = self.entries.remove(&encoded) {
                self.total_bytes.fetch_sub(removed.meta.size_bytes, Ordering::AcqRel);
            }
            self.counters.record_miss(key.kind);
            return GetResult::Miss;
        }

        entry.meta.last_access_unix_ms = now_unix_ms;
        self.counters.record_hit(key.kind);
        GetResult::Hit(entry.artifact.clone())
    }

    /// Update `last_access_at` on `key` without returning the artifact
    /// (spec §4.4 `Touch`). No-op if missing or expired.
    pub fn touch(&self, key: &CacheKey, now_unix_ms: u64) {
        if let Some(mut entry) = self.entries.get_mut(&key.encode()) {
            if entry.meta.is_live_at(now_unix_ms) {
                entry.meta.last_access_unix_ms = now_unix_ms;
            }
        }
    }

    /// Store `artifact` under `key` with the given TTL (spec §4.4 `Put`),
    /// then run LRU eviction if the store is over budget.
    pub fn put(
        &self,
        key: &CacheKey,
        artifact: AnalysisArtifact,
        ttl_seconds: u64,
        params_json: serde_json::Value,
        now_unix_ms: u64,
    ) {
        let size_bytes = artifact.approx_size_bytes();
        let meta = CacheEntryMeta {
            key: key.clone(),
            created_at_unix_ms: now_unix_ms,
            last_access_unix_ms: now_unix_ms,
            ttl_seconds,
            size_bytes,
            params_json,
            computed_at_unix_ms: now_unix_ms,
        };

        let encoded = key.encode();
        if let Some(previous) = self.entries.insert(encoded, StoredEntry { meta, artifact }) {
            self.total_bytes.fetch_sub(previous.meta.size_bytes, Ordering::AcqRel);
        }
        self.total_bytes.fetch_add(size_bytes, Ordering::AcqRel);

        self.evict_if_over_budget(now_unix_ms);
    }

    /// `GetOrCompute` (spec §4.4 "Stampede suppression"): a MISS triggers at
    /// most one `compute` per key among concurrent callers. Errors are not
    /// cached. Returns the artifact and whether it was served from cache.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] if `single_flight_timeout` elapses
    /// before a result is available (the computation itself keeps running).
    /// Propagates the compute function's error otherwise, wrapped as
    /// [`CoreError::Processing`].
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        ttl_seconds: u64,
        params_json: serde_json::Value,
        now_unix_ms: u64,
        compute: F,
    ) -> Result<(AnalysisArtifact, bool), CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisArtifact, CoreError>> + Send + 'static,
    {
        if let GetResult::Hit(artifact) = self.get(key, now_unix_ms) {
            return Ok((artifact, true));
        }

        let encoded = key.encode();
        let result = self
            .single_flight
            .get_or_compute(&encoded, self.single_flight_timeout, move || async move {
                compute().await.map_err(|err| err.to_string())
            })
            .await;

        match result {
            Ok(artifact) => {
                self.put(key, artifact.clone(), ttl_seconds, params_json, now_unix_ms);
                Ok((artifact, false))
            }
            Err(SingleFlightError::Timeout) => Err(CoreError::Timeout {
                elapsed_ms: self.single_flight_timeout.as_millis() as u64,
            }),
            Err(SingleFlightError::Computation(message)) => Err(CoreError::Processing {
                operation: key.kind.to_string(),
                context: message,
            }),
        }
    }

    /// Pre-compute entries for `keys` that are currently MISS (spec §4.4
    /// `Warm`). Returns the number of entries freshly computed.
    pub async fn warm<F, Fut>(&self, requests: &[(CacheKey, u64)], now_unix_ms: u64, compute: F) -> usize
    where
        F: Fn(CacheKey) -> Fut,
        Fut: Future<Output = Result<AnalysisArtifact, CoreError>> + Send + 'static,
    {
        let mut warmed = 0;
        for (key, ttl_seconds) in requests {
            if matches!(self.get(key, now_unix_ms), GetResult::Hit(_)) {
                continue;
            }
            let key_owned = key.clone();
            let future = compute(key_owned);
            let result = self
                .get_or_compute(
                    key,
                    *ttl_seconds,
                    serde_json::Value::Null,
                    now_unix_ms,
                    move || future,
                )
                .await;
            if matches!(result, Ok((_, false))) {
                warmed += 1;
            }
        }
        warmed
    }

    /// Purge EXPIRED and version-orphaned entries (spec §4.4 `Cleanup`).
    /// Returns the count removed.
    pub fn cleanup(&self, now_unix_ms: u64) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                !entry.meta.is_live_at(now_unix_ms)
                    || entry.meta.key.version < self.current_version(entry.meta.key.kind)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for key in &stale {
            if let Some((_, removed)) = self.entries.remove(key) {
                self.total_bytes.fetch_sub(removed.meta.size_bytes, Ordering::AcqRel);
            }
        }
        if !stale.is_empty() {
            tracing::debug!(removed = stale.len(), "cache cleanup reaped stale entries");
        }
        stale.len()
    }

    /// Snapshot hit/miss/eviction counters and current byte usage (spec
    /// §4.4 `Stats`).
    pub fn stats(&self) -> StatsSnapshot {
        self.counters.snapshot(self.total_bytes.load(Ordering::Acquire))
    }

    /// Remove every entry whose key's `image_hash` matches (spec §6
    /// `ClearCache` with an `image_hash` filter, and `DeleteImage`'s "removes
    /// ... all cache entries under hash" side effect). Returns the count
    /// removed.
    pub fn clear_for_image(&self, image_hash: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.meta.key.image_hash == image_hash)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &matching {
            if let Some((_, removed)) = self.entries.remove(key) {
                self.total_bytes.fetch_sub(removed.meta.size_bytes, Ordering::AcqRel);
            }
        }
        matching.len()
    }

    /// Remove every entry (spec §6 `ClearCache` with no filter). Returns the
    /// count removed.
    pub fn clear_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.total_bytes.store(0, Ordering::Release);
        count
    }

    fn evict_if_over_budget(&self, now_unix_ms: u64) {
        if self.total_bytes.load(Ordering::Acquire) <= self.max_bytes {
            return;
        }
        let target = (self.max_bytes as f64 * EVICTION_TARGET_FRACTION) as u64;

        let oldest_last_access = self
            .entries
            .iter()
            .map(|entry| entry.meta.last_access_unix_ms)
            .min()
            .unwrap_or(now_unix_ms);

        let mut scored: Vec<(f64, String, Kind, u64)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = entry.meta.eviction_score(now_unix_ms, oldest_last_access, self.eviction_weights);
                (score, entry.key().clone(), entry.meta.key.kind, entry.meta.size_bytes)
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut evicted = 0u64;
        for (_, encoded_key, kind, size_bytes) in scored {
            if self.total_bytes.load(Ordering::Acquire) <= target {
                break;
            }
            if self.entries.remove(&encoded_key).is_some() {
                self.total_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
                self.counters.record_eviction(kind);
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, max_bytes = self.max_bytes, "evicted entries over budget");
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::DetectionArtifact;

    fn artifact() -> AnalysisArtifact {
        AnalysisArtifact::Detect(DetectionArtifact { detections: vec![] })
    }

    fn key(version: u64) -> CacheKey {
        CacheKey::new(Kind::Detect, version, "a".repeat(32), "fp")
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = ResultCache::new();
        assert!(matches!(cache.get(&key(0), 0), GetResult::Miss));
    }

    #[test]
    fn put_then_get_is_a_hit() {
        let cache = ResultCache::new();
        cache.put(&key(0), artifact(), 60, serde_json::Value::Null, 0);
        assert!(matches!(cache.get(&key(0), 1000), GetResult::Hit(_)));
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_reaped() {
        let cache = ResultCache::new();
        cache.put(&key(0), artifact(), 1, serde_json::Value::Null, 0);
        assert!(matches!(cache.get(&key(0), 5000), GetResult::Miss));
        assert_eq!(cache.stats().bytes, 0);
    }

    #[test]
    fn invalidate_version_makes_old_version_unreachable() {
        let cache = ResultCache::new();
        cache.put(&key(0), artifact(), 60, serde_json::Value::Null, 0);
        cache.invalidate_version(Kind::Detect);
        assert!(matches!(cache.get(&key(0), 1000), GetResult::Miss));
    }

    #[test]
    fn restore_version_raises_but_never_lowers_the_counter() {
        let cache = ResultCache::new();
        cache.restore_version(Kind::Detect, 5);
        assert_eq!(cache.current_version(Kind::Detect), 5);
        cache.restore_version(Kind::Detect, 2);
        assert_eq!(cache.current_version(Kind::Detect), 5);
        cache.restore_version(Kind::Detect, 9);
        assert_eq!(cache.current_version(Kind::Detect), 9);
    }

    #[test]
    fn cleanup_removes_expired_and_orphaned_entries() {
        let cache = ResultCache::new();
        cache.put(&key(0), artifact(), 1, serde_json::Value::Null, 0);
        cache.put(&key(1), artifact(), 60, serde_json::Value::Null, 0);
        cache.invalidate_version(Kind::Detect);
        let removed = cache.cleanup(5000);
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn get_or_compute_caches_fresh_result() {
        let cache = ResultCache::new();
        let result = cache
            .get_or_compute(&key(0), 60, serde_json::Value::Null, 0, || async { Ok(artifact()) })
            .await
            .unwrap();
        assert!(!result.1);
        let second = cache.get(&key(0), 0);
        assert!(matches!(second, GetResult::Hit(_)));
    }

    #[tokio::test]
    async fn get_or_compute_does_not_cache_errors() {
        let cache = ResultCache::new();
        let result = cache
            .get_or_compute(&key(0), 60, serde_json::Value::Null, 0, || async {
                Err(CoreError::Processing {
                    operation: "x".into(),
                    context: "boom".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert!(matches!(cache.get(&key(0), 0), GetResult::Miss));
    }

    #[test]
    fn eviction_trims_to_target_fraction() {
        let cache = ResultCache::with_config(1000, EvictionWeights::default(), DEFAULT_SINGLE_FLIGHT_TIMEOUT);
        for i in 0..20u64 {
            let k = CacheKey::new(Kind::Detect, 0, format!("{i:032}"), "fp");
            cache.put(&k, artifact(), 60, serde_json::Value::Null, i);
        }
        assert!(cache.stats().bytes <= 1000);
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn clear_for_image_removes_only_matching_hash() {
        let cache = ResultCache::new();
        let target = "a".repeat(32);
        let other = "b".repeat(32);
        cache.put(&CacheKey::new(Kind::Detect, 0, target.clone(), "fp"), artifact(), 60, serde_json::Value::Null, 0);
        cache.put(&CacheKey::new(Kind::Nature, 0, target.clone(), "fp"), artifact(), 60, serde_json::Value::Null, 0);
        cache.put(&CacheKey::new(Kind::Detect, 0, other.clone(), "fp"), artifact(), 60, serde_json::Value::Null, 0);

        let removed = cache.clear_for_image(&target);

        assert_eq!(removed, 2);
        assert!(matches!(cache.get(&CacheKey::new(Kind::Detect, 0, target.clone(), "fp"), 0), GetResult::Miss));
        assert!(matches!(cache.get(&CacheKey::new(Kind::Detect, 0, other, "fp"), 0), GetResult::Hit(_)));
    }

    #[test]
    fn clear_all_empties_the_cache_and_resets_byte_total() {
        let cache = ResultCache::new();
        cache.put(&key(0), artifact(), 60, serde_json::Value::Null, 0);
        cache.put(&key(1), artifact(), 60, serde_json::Value::Null, 0);

        let removed = cache.clear_all();

        assert_eq!(removed, 2);
        assert_eq!(cache.stats().bytes, 0);
        assert!(matches!(cache.get(&key(0), 0), GetResult::Miss));
    }
}
