// SPDX-License-Identifier: Apache-2.0
//! Request/response DTOs for the abstract operations in spec §6. These are
//! transport-agnostic — `bins/parkvision-server` maps them onto JSON bodies,
//! but nothing here depends on `axum` or HTTP.

use parkvision_render::RenderRequest;
use parkvision_types::{ImageRecord, Kind};
use serde::{Deserialize, Serialize};

/// `UploadImage` input.
#[derive(Debug, Clone)]
pub struct UploadImageRequest {
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
    /// Client-supplied filename.
    pub filename: String,
    /// Declared MIME type string (e.g. `"image/png"`).
    pub mime: String,
}

/// `UploadImage` status discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// A new blob and record were created.
    Stored,
    /// An exact `image_hash` match already existed.
    Duplicate,
    /// Stored, but one or more near-duplicates exist.
    Similar,
}

/// `UploadImage` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageResponse {
    /// Content hash of the (possibly pre-existing) record.
    pub image_hash: String,
    /// Perceptual hash of the (possibly pre-existing) record.
    pub perceptual_hash: String,
    /// Outcome discriminant.
    pub status: UploadStatus,
    /// Near-duplicate image hashes, nearest first (empty unless `Similar`).
    pub similar_images: Vec<String>,
}

/// `ListImages` input.
#[derive(Debug, Clone, Default)]
pub struct ListImagesRequest {
    /// Zero-based page index.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
}

/// `ListImages` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListImagesResponse {
    /// Records in this page.
    pub records: Vec<ImageRecord>,
    /// Total live record count, for client-side pagination controls.
    pub total: usize,
}

/// `CheckDuplicate` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDuplicateResponse {
    /// Whether `image_hash` has an exact match (always true for itself; this
    /// flags whether near-duplicates exist besides itself).
    pub is_duplicate: bool,
    /// Other image hashes with Hamming distance `0` (content-identical
    /// perceptual hash under a different `image_hash`).
    pub exact_matches: Vec<String>,
    /// Near-duplicate image hashes with their Hamming distance, nearest
    /// first.
    pub similar_images: Vec<(String, u32)>,
}

/// `Analyze` input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Source image content hash.
    pub image_hash: String,
    /// Which analysis kind to run.
    pub kind: Kind,
    /// Caller-visible parameters (feeds the cache key's `param_fingerprint`).
    pub params: serde_json::Value,
    /// Bypass the cache and recompute even on a version-current HIT.
    pub force_refresh: bool,
}

/// `AnalyzeNature` input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeNatureRequest {
    /// Source image content hash.
    pub image_hash: String,
    /// Minimum label confidence considered during scoring.
    pub confidence_threshold: f32,
    /// Bypass the cache and recompute even on a version-current HIT.
    pub force_refresh: bool,
}

/// `DownloadAnnotated` input.
#[derive(Debug, Clone)]
pub struct DownloadAnnotatedRequest {
    /// Source image content hash.
    pub image_hash: String,
    /// Rendering options.
    pub render_request: RenderRequest,
}

/// `DownloadAnnotated` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadAnnotatedResponse {
    /// URL of the stored annotated blob.
    pub annotated_blob_url: String,
    /// Render statistics.
    pub stats: parkvision_types::AnnotationStats,
    /// Output format.
    pub format: parkvision_types::ImageFormat,
    /// Encoded byte size.
    pub size_bytes: u64,
    /// Whether this render was served from an existing cache entry rather
    /// than freshly computed.
    pub from_cache: bool,
}

/// `Stats` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Cache hit/miss/eviction counters and current byte usage.
    pub cache: parkvision_cache::StatsSnapshot,
    /// Number of live (non-tombstoned) image records.
    pub live_image_count: usize,
}

/// `ClearCache` input. `None` clears the whole cache; `Some(hash)` clears
/// only entries for that image.
#[derive(Debug, Clone, Default)]
pub struct ClearCacheRequest {
    /// Restrict clearing to this image hash, if set.
    pub image_hash: Option<String>,
}
