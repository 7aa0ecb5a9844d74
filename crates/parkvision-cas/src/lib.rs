// SPDX-License-Identifier: Apache-2.0
//! Content-addressed image ingestion and deduplication.
//!
//! `parkvision-cas` provides the [`ContentStore`] trait: ingest raw upload
//! bytes into an [`ImageRecord`](parkvision_types::ImageRecord), keyed by a
//! content hash, with near-duplicate detection via a perceptual hash.
//! Phase 1 ships [`MemoryStore`] — a process-local store suitable for a
//! single-instance deployment or as the hot layer in front of a durable one.
//!
//! # Hash Domain Policy
//!
//! `image_hash` is MD5 over the raw upload bytes, hex-encoded lowercase
//! (32 chars). Two uploads with identical bytes collapse to the same
//! `image_hash` regardless of filename or declared MIME — deduplication is
//! the point. `perceptual_hash` is a separate, coarser signature (64-bit DCT
//! reduction over a downsampled grayscale copy, 16 hex chars) used only for
//! [`ContentStore::find_similar`] — it never substitutes for `image_hash`
//! identity.
//!
//! # Determinism Invariant
//!
//! Identity is content-level (same bytes → same `image_hash`), not
//! collection-level — nothing about which hash a record gets depends on
//! insertion order. [`ContentStore::list_live`] does expose an order (by
//! `upload_time_unix_ms`, for `ListImages` pagination), but that order is a
//! presentation detail, not part of a record's identity.
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
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

mod memory;
mod phash;

pub use memory::MemoryStore;
pub use phash::{hamming_distance, perceptual_hash};

use parkvision_types::{ImageRecord, MimeType};

/// Default max upload size (spec §4.1): 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default similarity threshold in Hamming bits (spec §4.1).
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 5;

/// Errors raised by a [`ContentStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum CasError {
    /// MIME type not in `{jpeg, png, gif, bmp, webp}`, or size exceeds the
    /// configured maximum.
    #[error("validation error: {message}")]
    Validation {
        /// Explanation of the rejected input.
        message: String,
    },
    /// The blob write failed; metadata was not committed.
    #[error("storage error: {message}")]
    Storage {
        /// Explanation of the storage failure.
        message: String,
    },
}

/// Outcome of [`ContentStore::ingest`] (spec §4.1).
#[derive(Debug, Clone)]
pub enum IngestResult {
    /// A new blob was written and a new record created.
    Stored {
        /// The newly created record.
        record: ImageRecord,
    },
    /// An exact `image_hash` match already existed; nothing was written.
    Duplicate {
        /// The pre-existing record.
        record: ImageRecord,
    },
    /// No exact match, but one or more near-duplicates were found under the
    /// similarity threshold. The new record IS stored.
    Similar {
        /// The newly created record.
        record: ImageRecord,
        /// Near-duplicate records found via perceptual hash, nearest first.
        similar: Vec<ImageRecord>,
    },
}

impl IngestResult {
    /// The record produced by this ingest, regardless of which variant.
    pub fn record(&self) -> &ImageRecord {
        match self {
            Self::Stored { record } | Self::Duplicate { record } | Self::Similar { record, .. } => {
                record
            }
        }
    }
}

/// Content-addressed image store.
///
/// Implementations own both metadata (`ImageRecord`) and the decision of
/// whether a given upload is new, an exact duplicate, or a near-duplicate.
/// They do not own original blob bytes persistence — that is
/// `parkvision-blobstore`'s job; a `ContentStore` records the `blob_url` a
/// caller supplies after a successful blob write.
pub trait ContentStore {
    /// Ingest raw upload bytes (spec §4.1).
    ///
    /// # Errors
    ///
    /// Returns [`CasError::Validation`] if `mime` is unsupported or `bytes`
    /// exceeds the configured max size. Returns [`CasError::Storage`] if the
    /// caller-supplied `blob_url` could not be committed alongside the
    /// metadata.
    fn ingest(
        &mut self,
        bytes: &[u8],
        filename: &str,
        mime: MimeType,
        blob_url: String,
        now_unix_ms: u64,
    ) -> Result<IngestResult, CasError>;

    /// Look up a record by exact `image_hash`.
    fn lookup(&self, image_hash: &str) -> Option<ImageRecord>;

    /// Find live records whose perceptual hash is within `max_hamming` bits
    /// of `perceptual_hash`, nearest first.
    fn find_similar(&self, perceptual_hash: &str, max_hamming: u32) -> Vec<ImageRecord>;

    /// Tombstone a record: clears `blob_url` so [`ImageRecord::is_live`]
    /// becomes `false`. No-op if `image_hash` is unknown.
    fn delete(&mut self, image_hash: &str);

    /// List every live record, oldest upload first (spec §6 `ListImages`).
    fn list_live(&self) -> Vec<ImageRecord>;
}

/// Validate mime/size per spec §4.1. Shared by every `ContentStore` impl so
/// the rejection rule cannot drift between implementations.
pub(crate) fn validate_upload(bytes: &[u8], max_bytes: u64) -> Result<(), CasError> {
    if bytes.is_empty() {
        return Err(CasError::Validation {
            message: "upload is empty".into(),
        });
    }
    if bytes.len() as u64 > max_bytes {
        return Err(CasError::Validation {
            message: format!("upload size {} exceeds max {}", bytes.len(), max_bytes),
        });
    }
    Ok(())
}

/// Compute the MD5 `image_hash` (spec §4.1): lowercase 32-hex-char digest of
/// the raw bytes.
pub fn image_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_upload_rejects_empty() {
        assert!(validate_upload(&[], DEFAULT_MAX_BYTES).is_err());
    }

    #[test]
    fn validate_upload_rejects_oversized() {
        let bytes = vec![0u8; 11 * 1024 * 1024];
        assert!(validate_upload(&bytes, DEFAULT_MAX_BYTES).is_err());
    }

    #[test]
    fn image_hash_is_32_hex_chars() {
        let hash = image_hash(b"hello world");
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn image_hash_is_deterministic() {
        assert_eq!(image_hash(b"abc"), image_hash(b"abc"));
        assert_ne!(image_hash(b"abc"), image_hash(b"abd"));
    }
}
