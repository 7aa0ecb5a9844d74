// SPDX-License-Identifier: Apache-2.0
//! Raw vision-provider primitives (spec §4.3) — the input the Natural-
//! Element Analyzer and Annotation Renderer transform into artifacts. These
//! are deliberately NOT the same types as [`crate::artifact`]'s output
//! types: primitives are upstream-shaped (raw labels, raw detections) and
//! artifacts are domain-shaped (coverage, health scores).

use serde::{Deserialize, Serialize};

use crate::artifact::{BoundingBox, Likelihood};

/// A single requested vision feature (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisionFeature {
    /// Keyword/scene labels.
    Label,
    /// Bounding-box object localization.
    ObjectLocalization,
    /// Face detection + landmarks + expression likelihoods.
    Face,
    /// Dominant-color / image-property extraction.
    ImageProperties,
    /// Content moderation signal (requested but not consumed downstream).
    SafeSearch,
}

/// One raw label returned by the vision provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLabel {
    /// Provider-supplied description, not yet normalized.
    pub description: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// One raw localized object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObject {
    /// Class/category name.
    pub name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Normalized bounding box.
    pub bbox: BoundingBox,
}

/// One raw detected face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFace {
    /// Normalized bounding box.
    pub bbox: BoundingBox,
    /// Facial landmarks, `(kind, x, y)`.
    pub landmarks: Vec<(&'static str, f32, f32)>,
    /// Anger likelihood.
    pub anger: Likelihood,
    /// Joy likelihood.
    pub joy: Likelihood,
    /// Sorrow likelihood.
    pub sorrow: Likelihood,
    /// Surprise likelihood.
    pub surprise: Likelihood,
    /// Whether the face is blurred.
    pub blurred: bool,
    /// Whether the subject is wearing headwear.
    pub headwear: bool,
}

/// One raw dominant color from `IMAGE_PROPERTIES`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawDominantColor {
    /// Red channel, `0..=255`.
    pub r: u8,
    /// Green channel, `0..=255`.
    pub g: u8,
    /// Blue channel, `0..=255`.
    pub b: u8,
    /// Fraction of the image this color occupies, `[0, 1]`.
    pub pixel_fraction: f32,
}

/// One feature's per-feature failure inside a partial-result bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureError {
    /// Which feature failed.
    pub feature: VisionFeature,
    /// Human-readable explanation.
    pub message: String,
}

/// `PrimitiveBundle` (spec §4.3): the vision provider's raw response,
/// covering whichever subset of the requested features actually succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimitiveBundle {
    /// Labels, present iff `LABEL` was requested and succeeded.
    pub labels: Option<Vec<RawLabel>>,
    /// Localized objects, present iff `OBJECT_LOCALIZATION` succeeded.
    pub objects: Option<Vec<RawObject>>,
    /// Faces, present iff `FACE` succeeded.
    pub faces: Option<Vec<RawFace>>,
    /// Dominant colors, present iff `IMAGE_PROPERTIES` succeeded.
    pub dominant_colors: Option<Vec<RawDominantColor>>,
    /// Per-feature failures for requested-but-unsuccessful features.
    pub errors: Vec<FeatureError>,
}

impl PrimitiveBundle {
    /// Number of features that returned data.
    pub fn succeeded_count(&self) -> usize {
        [
            self.labels.is_some(),
            self.objects.is_some(),
            self.faces.is_some(),
            self.dominant_colors.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_has_no_successes() {
        assert_eq!(PrimitiveBundle::default().succeeded_count(), 0);
    }

    #[test]
    fn partial_bundle_counts_only_present_features() {
        let bundle = PrimitiveBundle {
            labels: Some(vec![]),
            objects: None,
            faces: Some(vec![]),
            dominant_colors: None,
            errors: vec![FeatureError {
                feature: VisionFeature::ObjectLocalization,
                message: "quota exceeded".into(),
            }],
        };
        assert_eq!(bundle.succeeded_count(), 2);
    }
}
