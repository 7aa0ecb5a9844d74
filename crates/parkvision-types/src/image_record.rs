// SPDX-License-Identifier: Apache-2.0
//! `ImageRecord` (spec §3) — identity and metadata for an ingested image.

use serde::{Deserialize, Serialize};

/// Supported upload MIME types (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeType {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/gif`
    Gif,
    /// `image/bmp`
    Bmp,
    /// `image/webp`
    Webp,
}

impl MimeType {
    /// Parse a MIME type string such as `"image/jpeg"`. Returns `None` for
    /// anything outside spec §4.1's allowed set.
    pub fn from_mime_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/bmp" => Some(Self::Bmp),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// File extension used in blob object names (spec §4.2).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
        }
    }

    /// Lowercase subtype name as used in `AppConfig::allowed_mime_types`
    /// (e.g. `"jpeg"`, not the `"jpg"` file extension).
    pub fn subtype_name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
        }
    }
}

/// `E:ImageRecord` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 32-hex-char MD5 of the raw upload bytes. Unique per distinct byte
    /// content (dedup collapses equal-hash uploads into one record).
    pub image_hash: String,
    /// 16-hex-char perceptual hash.
    pub perceptual_hash: String,
    /// Original upload filename as provided by the client.
    pub filename: String,
    /// Size of the original bytes.
    pub size_bytes: u64,
    /// Declared/sniffed MIME type.
    pub mime_type: MimeType,
    /// URL at which the original blob is reachable (absent iff tombstoned).
    pub blob_url: Option<String>,
    /// Decoded pixel width.
    pub width: u32,
    /// Decoded pixel height.
    pub height: u32,
    /// Unix millis of first successful upload.
    pub upload_time_unix_ms: u64,
}

impl ImageRecord {
    /// Whether the record's blob is reachable (not tombstoned by `Delete`).
    pub fn is_live(&self) -> bool {
        self.blob_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_str_accepts_known_types() {
        assert_eq!(MimeType::from_mime_str("image/jpeg"), Some(MimeType::Jpeg));
        assert_eq!(MimeType::from_mime_str("IMAGE/PNG"), Some(MimeType::Png));
        assert_eq!(MimeType::from_mime_str("image/webp"), Some(MimeType::Webp));
    }

    #[test]
    fn mime_from_str_rejects_unknown() {
        assert_eq!(MimeType::from_mime_str("application/pdf"), None);
        assert_eq!(MimeType::from_mime_str("image/tiff"), None);
    }

    #[test]
    fn extension_matches_mime() {
        assert_eq!(MimeType::Jpeg.extension(), "jpg");
        assert_eq!(MimeType::Png.extension(), "png");
    }

    #[test]
    fn subtype_name_differs_from_extension_for_jpeg() {
        assert_eq!(MimeType::Jpeg.subtype_name(), "jpeg");
        assert_eq!(MimeType::Webp.subtype_name(), "webp");
    }

    #[test]
    fn tombstoned_record_is_not_live() {
        let record = ImageRecord {
            image_hash: "a".repeat(32),
            perceptual_hash: "b".repeat(16),
            filename: "x.png".into(),
            size_bytes: 10,
            mime_type: MimeType::Png,
            blob_url: None,
            width: 1,
            height: 1,
            upload_time_unix_ms: 0,
        };
        assert!(!record.is_live());
    }
}
