// SPDX-License-Identifier: Apache-2.0
//! `CacheKey` and `CacheEntry` metadata (spec §3, §4.4).

use serde::{Deserialize, Serialize};

/// Discriminant over the seven result kinds (spec GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Object/label detection.
    Detect,
    /// Face detection.
    Faces,
    /// Natural-element analysis.
    Nature,
    /// Server-rendered annotated image.
    Annotate,
    /// Segmentation (reserved; not implemented by an analyzer in this repo,
    /// but carried as a first-class kind per spec §3/§4.4 TTL table).
    Segment,
    /// Feature extraction (reserved; see `Segment`).
    Extract,
    /// Batch job progress state.
    Batch,
}

impl Kind {
    /// All kinds, in the fixed order used for `Stats()` per-kind breakdowns.
    pub const ALL: [Kind; 7] = [
        Kind::Detect,
        Kind::Faces,
        Kind::Nature,
        Kind::Annotate,
        Kind::Segment,
        Kind::Extract,
        Kind::Batch,
    ];

    /// Lowercase wire name, matching the key-encoding grammar in spec §4.4.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Detect => "detect",
            Kind::Faces => "faces",
            Kind::Nature => "nature",
            Kind::Annotate => "annotate",
            Kind::Segment => "segment",
            Kind::Extract => "extract",
            Kind::Batch => "batch",
        }
    }

    /// Default TTL in seconds, per the spec §4.4 TTL table.
    pub fn default_ttl_seconds(self) -> u64 {
        match self {
            Kind::Detect => 24 * 3600,
            Kind::Faces => 24 * 3600,
            Kind::Nature => 48 * 3600,
            Kind::Annotate => 72 * 3600,
            Kind::Segment => 7 * 24 * 3600,
            Kind::Extract => 30 * 24 * 3600,
            Kind::Batch => 3600,
        }
    }

    /// `kind_weight` used in the LRU eviction priority score (spec §4.4):
    /// higher protects expensive results from eviction.
    pub fn kind_weight(self) -> f64 {
        match self {
            Kind::Extract => 1.0,
            Kind::Segment => 0.9,
            Kind::Nature => 0.6,
            Kind::Annotate => 0.5,
            Kind::Detect | Kind::Faces => 0.3,
            Kind::Batch => 0.1,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `E:CacheKey` (spec §3): `(kind, version, image_hash, param_fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Result kind.
    pub kind: Kind,
    /// Monotonic per-kind version counter at the time the key was built.
    pub version: u64,
    /// 32-hex-char content hash of the source image.
    pub image_hash: String,
    /// Stable hash of caller-visible parameters affecting the result.
    pub param_fingerprint: String,
}

impl CacheKey {
    /// Build a new key.
    pub fn new(
        kind: Kind,
        version: u64,
        image_hash: impl Into<String>,
        param_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            version,
            image_hash: image_hash.into(),
            param_fingerprint: param_fingerprint.into(),
        }
    }

    /// Encode as `"{kind}:v{version}:{image_hash}:{param_fingerprint}"`
    /// (spec §4.4).
    pub fn encode(&self) -> String {
        format!(
            "{}:v{}:{}:{}",
            self.kind, self.version, self.image_hash, self.param_fingerprint
        )
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// `E:CacheEntry` metadata (spec §3) — the artifact bytes/value live
/// alongside this in the cache's own storage; this struct is the bookkeeping
/// the eviction/stats logic operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    /// The key this entry was stored under.
    pub key: CacheKey,
    /// Unix millis at creation.
    pub created_at_unix_ms: u64,
    /// Unix millis of the most recent HIT (updated by `Touch`).
    pub last_access_unix_ms: u64,
    /// TTL in seconds.
    pub ttl_seconds: u64,
    /// Size of the serialized artifact, in bytes.
    pub size_bytes: u64,
    /// Caller-visible parameters, for diagnostics (`Stats`, debugging).
    pub params_json: serde_json::Value,
    /// Unix millis the artifact finished computing.
    pub computed_at_unix_ms: u64,
}

impl CacheEntryMeta {
    /// Whether the entry is still live at `now_unix_ms` (spec §3 invariant:
    /// `now - created_at <= ttl_seconds`).
    pub fn is_live_at(&self, now_unix_ms: u64) -> bool {
        let age_ms = now_unix_ms.saturating_sub(self.created_at_unix_ms);
        age_ms <= self.ttl_seconds.saturating_mul(1000)
    }

    /// Eviction priority score (spec §4.4):
    /// `w_ttl * (remaining_ttl / initial_ttl) + w_kind * kind_weight + w_recency * normalized_last_access`.
    ///
    /// Lower scores are evicted first. `normalized_last_access` is the
    /// fraction of `[oldest_last_access, now]` elapsed since this entry's
    /// last access (0 = just accessed, 1 = accessed at the oldest boundary);
    /// callers pass in the window bounds so the score is consistent across
    /// the whole eviction pass.
    pub fn eviction_score(
        &self,
        now_unix_ms: u64,
        oldest_last_access_unix_ms: u64,
        weights: EvictionWeights,
    ) -> f64 {
        let ttl_ms = self.ttl_seconds.saturating_mul(1000).max(1);
        let age_ms = now_unix_ms.saturating_sub(self.created_at_unix_ms);
        let remaining_fraction = 1.0 - (age_ms as f64 / ttl_ms as f64).clamp(0.0, 1.0);

        let window_ms = now_unix_ms
            .saturating_sub(oldest_last_access_unix_ms)
            .max(1);
        let staleness_ms = now_unix_ms.saturating_sub(self.last_access_unix_ms);
        let normalized_recency = 1.0 - (staleness_ms as f64 / window_ms as f64).clamp(0.0, 1.0);

        weights.w_ttl * remaining_fraction
            + weights.w_kind * self.key.kind.kind_weight()
            + weights.w_recency * normalized_recency
    }
}

/// Weights for [`CacheEntryMeta::eviction_score`] (spec §4.4 defaults).
#[derive(Debug, Clone, Copy)]
pub struct EvictionWeights {
    /// Weight on remaining-TTL fraction.
    pub w_ttl: f64,
    /// Weight on kind protection.
    pub w_kind: f64,
    /// Weight on recency.
    pub w_recency: f64,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        Self {
            w_ttl: 0.3,
            w_kind: 0.4,
            w_recency: 0.3,
        }
    }
}
