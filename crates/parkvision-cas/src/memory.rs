// SPDX-License-Identifier: Apache-2.0
//! In-memory content-addressed image store.
//!
//! [`MemoryStore`] is the Phase 1 [`ContentStore`] implementation — a
//! process-local `HashMap` keyed by `image_hash`, with a secondary scan over
//! live records for [`ContentStore::find_similar`]. A remote/durable tier is
//! a natural future addition behind the same trait.

use std::collections::HashMap;

use image::{DynamicImage, GenericImageView};
use parkvision_types::{ImageRecord, MimeType};

use crate::{
    hamming_distance, image_hash, perceptual_hash, validate_upload, CasError, ContentStore,
    IngestResult, DEFAULT_MAX_BYTES,
};

/// In-memory content-addressed image store.
pub struct MemoryStore {
    records: HashMap<String, ImageRecord>,
    max_bytes: u64,
}

impl MemoryStore {
    /// Create an empty store with the default max upload size.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Create an empty store with a custom max upload size.
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            records: HashMap::new(),
            max_bytes,
        }
    }

    /// Number of records tracked, live or tombstoned.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryStore {
    fn ingest(
        &mut self,
        bytes: &[u8],
        filename: &str,
        mime: MimeType,
        blob_url: String,
        now_unix_ms: u64,
    ) -> Result<IngestResult, CasError> {
        validate_upload(bytes, self.max_bytes)?;

        let hash = image_hash(bytes);
        if let Some(existing) = self.records.get(&hash) {
            return Ok(IngestResult::Duplicate {
                record: existing.clone(),
            });
        }

        let decoded = image::load_from_memory(bytes).map_err(|err| CasError::Validation {
            message: format!("failed to decode image: {err}"),
        })?;
        let (width, height) = decoded.dimensions();
        let phash = perceptual_hash(&decoded);

        let similar = self.find_similar(&phash, crate::DEFAULT_SIMILARITY_THRESHOLD);

        let record = ImageRecord {
            image_hash: hash.clone(),
            perceptual_hash: phash,
            filename: filename.to_owned(),
            size_bytes: bytes.len() as u64,
            mime_type: mime,
            blob_url: Some(blob_url),
            width,
            height,
            upload_time_unix_ms: now_unix_ms,
        };
        self.records.insert(hash, record.clone());

        if similar.is_empty() {
            Ok(IngestResult::Stored { record })
        } else {
            Ok(IngestResult::Similar { record, similar })
        }
    }

    fn lookup(&self, image_hash: &str) -> Option<ImageRecord> {
        self.records.get(image_hash).cloned()
    }

    fn find_similar(&self, perceptual_hash: &str, max_hamming: u32) -> Vec<ImageRecord> {
        let mut matches: Vec<(u32, ImageRecord)> = self
            .records
            .values()
            .filter(|record| record.is_live())
            .filter_map(|record| {
                let distance = hamming_distance(&record.perceptual_hash, perceptual_hash);
                (distance <= max_hamming).then(|| (distance, record.clone()))
            })
            .collect();
        matches.sort_by_key(|(distance, _)| *distance);
        matches.into_iter().map(|(_, record)| record).collect()
    }

    fn delete(&mut self, image_hash: &str) {
        if let Some(record) = self.records.get_mut(image_hash) {
            record.blob_url = None;
        }
    }

    fn list_live(&self) -> Vec<ImageRecord> {
        let mut live: Vec<ImageRecord> = self.records.values().filter(|r| r.is_live()).cloned().collect();
        live.sort_by(|a, b| {
            a.upload_time_unix_ms
                .cmp(&b.upload_time_unix_ms)
                .then_with(|| a.image_hash.cmp(&b.image_hash))
        });
        live
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(value: u8) -> Vec<u8> {
        let image = RgbaImage::from_pixel(64, 64, Rgba([value, value, value, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn ingest_new_image_is_stored() {
        let mut store = MemoryStore::new();
        let bytes = png_bytes(10);
        let result = store
            .ingest(&bytes, "a.png", MimeType::Png, "https://x/a.png".into(), 1000)
            .unwrap();
        assert!(matches!(result, IngestResult::Stored { .. }));
    }

    #[test]
    fn ingest_exact_duplicate_returns_duplicate() {
        let mut store = MemoryStore::new();
        let bytes = png_bytes(10);
        store
            .ingest(&bytes, "a.png", MimeType::Png, "https://x/a.png".into(), 1000)
            .unwrap();
        let result = store
            .ingest(&bytes, "b.png", MimeType::Png, "https://x/b.png".into(), 2000)
            .unwrap();
        match result {
            IngestResult::Duplicate { record } => assert_eq!(record.filename, "a.png"),
            other => panic!("expected Duplicate, got {other:?}"),
        }
    }

    #[test]
    fn ingest_rejects_empty_bytes() {
        let mut store = MemoryStore::new();
        let result = store.ingest(&[], "empty.png", MimeType::Png, "https://x".into(), 0);
        assert!(result.is_err());
    }

    #[test]
    fn lookup_returns_none_for_unknown_hash() {
        let store = MemoryStore::new();
        assert!(store.lookup(&"0".repeat(32)).is_none());
    }

    #[test]
    fn delete_tombstones_without_removing_record() {
        let mut store = MemoryStore::new();
        let bytes = png_bytes(20);
        let result = store
            .ingest(&bytes, "a.png", MimeType::Png, "https://x/a.png".into(), 1000)
            .unwrap();
        let hash = result.record().image_hash.clone();
        store.delete(&hash);
        let record = store.lookup(&hash).unwrap();
        assert!(!record.is_live());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn list_live_excludes_tombstoned_and_orders_by_upload_time() {
        let mut store = MemoryStore::new();
        let first = store
            .ingest(&png_bytes(40), "a.png", MimeType::Png, "https://x/a.png".into(), 2000)
            .unwrap();
        let second = store
            .ingest(&png_bytes(50), "b.png", MimeType::Png, "https://x/b.png".into(), 1000)
            .unwrap();
        store.delete(&first.record().image_hash);

        let live = store.list_live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].image_hash, second.record().image_hash);
    }

    #[test]
    fn find_similar_excludes_tombstoned_records() {
        let mut store = MemoryStore::new();
        let bytes = png_bytes(30);
        let result = store
            .ingest(&bytes, "a.png", MimeType::Png, "https://x/a.png".into(), 1000)
            .unwrap();
        let phash = result.record().perceptual_hash.clone();
        let hash = result.record().image_hash.clone();
        store.delete(&hash);
        assert!(store.find_similar(&phash, 64).is_empty());
    }
}
