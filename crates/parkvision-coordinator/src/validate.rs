// SPDX-License-Identifier: Apache-2.0
//! Field-range validation (spec §4.8 `Received -> Validated`): centralized
//! here so the coordinator and any transport binary share one validation
//! path rather than each re-deriving the allowed ranges.

use parkvision_types::{CoreError, ImageFormat, Kind, MimeType};

/// Validate a confidence threshold is in `[0, 1]`.
pub fn confidence_threshold(value: f32) -> Result<(), CoreError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation {
            message: format!("confidence_threshold {value} out of range [0, 1]"),
        })
    }
}

/// Validate a render quality value is in `[1, 100]`.
pub fn quality(value: u8) -> Result<(), CoreError> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation {
            message: format!("quality {value} out of range [1, 100]"),
        })
    }
}

/// Validate a render output format string is one of `{png, jpg, webp}`.
pub fn render_format(value: &str) -> Result<ImageFormat, CoreError> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
        "webp" => Ok(ImageFormat::Webp),
        other => Err(CoreError::Validation {
            message: format!("unsupported render format {other:?}, expected png/jpg/webp"),
        }),
    }
}

/// Validate a 32-hex-char content hash.
pub fn image_hash(value: &str) -> Result<(), CoreError> {
    if value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(CoreError::Validation {
            message: format!("image_hash {value:?} is not a 32-hex-char content hash"),
        })
    }
}

/// Validate `mime` parses to a known image type and that type's name is
/// present in `allowed` (spec §6 `allowed_mime_types`).
pub fn mime_type(mime: &str, allowed: &[String]) -> Result<MimeType, CoreError> {
    let parsed = MimeType::from_mime_str(mime).ok_or_else(|| CoreError::Validation {
        message: format!("unsupported mime type {mime:?}"),
    })?;
    if allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(parsed.subtype_name())) {
        Ok(parsed)
    } else {
        Err(CoreError::Validation {
            message: format!("mime type {mime:?} is not in allowed_mime_types"),
        })
    }
}

/// Validate a non-empty batch of `image_hashes`/`kinds`.
pub fn non_empty_batch(image_hashes: &[String], kinds: &[Kind]) -> Result<(), CoreError> {
    if image_hashes.is_empty() || kinds.is_empty() {
        Err(CoreError::Validation {
            message: "batch requires at least one image_hash and one kind".to_owned(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_threshold_rejects_out_of_range() {
        assert!(confidence_threshold(0.0).is_ok());
        assert!(confidence_threshold(1.0).is_ok());
        assert!(confidence_threshold(-0.1).is_err());
        assert!(confidence_threshold(1.1).is_err());
    }

    #[test]
    fn quality_rejects_zero_and_above_100() {
        assert!(quality(1).is_ok());
        assert!(quality(100).is_ok());
        assert!(quality(0).is_err());
    }

    #[test]
    fn render_format_accepts_known_values_case_insensitively() {
        assert_eq!(render_format("PNG").unwrap(), ImageFormat::Png);
        assert_eq!(render_format("jpg").unwrap(), ImageFormat::Jpg);
        assert!(render_format("gif").is_err());
    }

    #[test]
    fn image_hash_requires_32_hex_chars() {
        assert!(image_hash(&"a".repeat(32)).is_ok());
        assert!(image_hash(&"a".repeat(31)).is_err());
        assert!(image_hash(&"z".repeat(32)).is_err());
    }

    #[test]
    fn mime_type_rejects_types_outside_allowed_list() {
        let allowed = vec!["jpeg".to_owned(), "png".to_owned()];
        assert_eq!(mime_type("image/jpeg", &allowed).unwrap(), MimeType::Jpeg);
        assert!(mime_type("image/gif", &allowed).is_err());
        assert!(mime_type("application/pdf", &allowed).is_err());
    }

    #[test]
    fn non_empty_batch_rejects_empty_inputs() {
        assert!(non_empty_batch(&[], &[Kind::Detect]).is_err());
        assert!(non_empty_batch(&["a".repeat(32)], &[]).is_err());
        assert!(non_empty_batch(&["a".repeat(32)], &[Kind::Detect]).is_ok());
    }
}
