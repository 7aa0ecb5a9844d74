// SPDX-License-Identifier: Apache-2.0
//! `E:AnalysisArtifact` (spec §3) — a discriminated union over result kind.
//!
//! Per the REDESIGN FLAGS in spec §9, this is a genuine Rust sum type (not a
//! loosely-typed map); the envelope carries `kind` via the variant itself.

use serde::{Deserialize, Serialize};

/// A normalized `[0, 1]` bounding box, `(x, y, w, h)`, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge, normalized.
    pub x: f32,
    /// Top edge, normalized.
    pub y: f32,
    /// Width, normalized.
    pub w: f32,
    /// Height, normalized.
    pub h: f32,
}

impl BoundingBox {
    /// Clamp all fields to `[0, 1]`, as required by the spec §3 invariant on
    /// `Detection`/`Face` bounding boxes.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
            w: self.w.clamp(0.0, 1.0),
            h: self.h.clamp(0.0, 1.0),
        }
    }

    /// Normalized center point.
    pub fn center(self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Area as a percentage of the full image (`w * h * 100`).
    pub fn area_pct(self) -> f32 {
        self.w * self.h * 100.0
    }
}

/// One detected object (spec §3 `Detection`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Stable per-response identifier.
    pub object_id: u32,
    /// Taxonomy class name (e.g. `"tree"`, `"bench"`).
    pub class_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Normalized bounding box.
    pub bbox: BoundingBox,
    /// Normalized center point, `(x, y)`.
    pub center: (f32, f32),
    /// Area as a percentage of the full image.
    pub area_pct: f32,
}

/// `DetectionArtifact` (spec §3): ordered list of detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionArtifact {
    /// Detections, ordered as returned by the vision provider (callers that
    /// need confidence order should sort explicitly).
    pub detections: Vec<Detection>,
}

/// Likelihood bucket used for face expression/attribute scoring (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Likelihood {
    /// `VERY_UNLIKELY`
    VeryUnlikely,
    /// `UNLIKELY`
    Unlikely,
    /// `POSSIBLE`
    Possible,
    /// `LIKELY`
    Likely,
    /// `VERY_LIKELY`
    VeryLikely,
}

/// A facial landmark point, normalized `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    /// Landmark kind (e.g. `"left_eye"`).
    pub kind: &'static str,
    /// Normalized x.
    pub x: f32,
    /// Normalized y.
    pub y: f32,
}

/// One detected face (spec §3 `Face`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    /// Stable per-response identifier.
    pub face_id: u32,
    /// Normalized bounding box.
    pub bbox: BoundingBox,
    /// Facial landmarks.
    pub landmarks: Vec<Landmark>,
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

/// `FaceArtifact` (spec §3): list of detected faces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceArtifact {
    /// Detected faces.
    pub faces: Vec<Face>,
}

/// Per-category natural-element coverage percentages (spec §4.5).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryCoverage {
    /// Vegetation coverage percentage.
    pub vegetation: f32,
    /// Sky coverage percentage.
    pub sky: f32,
    /// Water coverage percentage.
    pub water: f32,
    /// Terrain coverage percentage.
    pub terrain: f32,
    /// Built/human-made coverage percentage.
    pub built: f32,
}

impl CategoryCoverage {
    /// Sum of all category percentages.
    pub fn total(&self) -> f32 {
        self.vegetation + self.sky + self.water + self.terrain + self.built
    }
}

/// Vegetation-health sub-scores and overall score (spec §4.5.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VegetationHealth {
    /// Color-based sub-score, `[0, 100]`.
    pub color_score: f32,
    /// Coverage-based sub-score, `[0, 100]`.
    pub coverage_score: f32,
    /// Label-based sub-score, `[0, 100]`.
    pub label_score: f32,
    /// Weighted overall score, `[0, 100]`.
    pub overall: f32,
    /// Status band derived from `overall`.
    pub status: VegetationStatus,
}

/// Status band for [`VegetationHealth::overall`] (spec §4.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VegetationStatus {
    /// `overall >= 70`
    Healthy,
    /// `overall >= 40`
    Moderate,
    /// `overall >= 15`
    Poor,
    /// `overall < 15`
    Unknown,
}

impl VegetationStatus {
    /// Classify an overall score into its status band.
    pub fn from_overall(overall: f32) -> Self {
        if overall >= 70.0 {
            Self::Healthy
        } else if overall >= 40.0 {
            Self::Moderate
        } else if overall >= 15.0 {
            Self::Poor
        } else {
            Self::Unknown
        }
    }
}

/// One of the four seasons, or `Unknown` (spec §4.5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    /// Spring.
    Spring,
    /// Summer.
    Summer,
    /// Autumn.
    Autumn,
    /// Winter.
    Winter,
    /// No season scored `>= 0.4`.
    Unknown,
}

/// Seasonal inference result (spec §4.5.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalAnalysis {
    /// The argmax season, or `Unknown`.
    pub primary: Season,
    /// Raw confidence sums per season (`Spring`, `Summer`, `Autumn`, `Winter`).
    pub confidences_by_season: [(Season, f32); 4],
    /// Matching label strings that contributed to `primary`.
    pub features: Vec<String>,
}

/// One dominant color (spec §4.5.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominantColor {
    /// `#rrggbb` hex string.
    pub hex: String,
    /// RGB triple.
    pub rgb: (u8, u8, u8),
    /// Percentage of the image this color occupies.
    pub pct: f32,
    /// Nearest named color from the fixed palette.
    pub name: &'static str,
}

/// Color analysis result (spec §4.5.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorAnalysis {
    /// Dominant colors, descending by `pct`.
    pub dominant_colors: Vec<DominantColor>,
    /// Shannon-entropy-based diversity score, `[0, 100]`.
    pub diversity_score: f32,
}

/// `NatureArtifact` (spec §3): the full natural-element analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatureArtifact {
    /// Per-category coverage.
    pub coverage: CategoryCoverage,
    /// Vegetation health.
    pub vegetation_health: VegetationHealth,
    /// Seasonal inference.
    pub seasonal: SeasonalAnalysis,
    /// Dominant color analysis.
    pub colors: ColorAnalysis,
    /// Fixed-table recommendations keyed off low sub-scores.
    pub recommendations: Vec<String>,
}

/// Confidence-bucket counts used in [`AnnotationStats`] (spec §4.6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConfidenceStats {
    /// Arithmetic mean confidence across rendered detections.
    pub mean: f32,
    /// Minimum confidence.
    pub min: f32,
    /// Maximum confidence.
    pub max: f32,
    /// Count with confidence `>= 0.8`.
    pub high: u32,
    /// Count with confidence in `[0.5, 0.8)`.
    pub medium: u32,
    /// Count with confidence `< 0.5`.
    pub low: u32,
}

/// Statistics attached to an annotated render (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationStats {
    /// Total objects drawn.
    pub total_objects: u32,
    /// Total faces drawn.
    pub total_faces: u32,
    /// Count of drawn objects per class name.
    pub class_histogram: std::collections::BTreeMap<String, u32>,
    /// Confidence distribution across drawn objects.
    pub confidence_stats: ConfidenceStats,
}

/// Supported render output formats (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG (lossless; `quality` ignored).
    Png,
    /// JPEG.
    Jpg,
    /// WebP.
    Webp,
}

impl ImageFormat {
    /// File extension used in blob object names (spec §4.2/§4.6).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// MIME type string for the blob store `Content-Type`.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// `AnnotatedImageArtifact` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedImageArtifact {
    /// URL of the stored annotated blob.
    pub blob_url: String,
    /// Output format.
    pub format: ImageFormat,
    /// Pixel width (preserved from the source image).
    pub width: u32,
    /// Pixel height (preserved from the source image).
    pub height: u32,
    /// Encoded byte size of the rendered blob.
    pub size_bytes: u64,
    /// Render statistics.
    pub stats: AnnotationStats,
}

/// The discriminated union over result kind (spec §3, §9 REDESIGN FLAGS).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisArtifact {
    /// Object/label detection result.
    Detect(DetectionArtifact),
    /// Face detection result.
    Faces(FaceArtifact),
    /// Natural-element analysis result.
    Nature(NatureArtifact),
    /// Annotated render result.
    Annotate(AnnotatedImageArtifact),
}

impl AnalysisArtifact {
    /// Approximate serialized size in bytes, used by the cache for LRU
    /// accounting (spec §3 `CacheEntry.size_bytes`).
    pub fn approx_size_bytes(&self) -> u64 {
        serde_json::to_vec(self).map(|v| v.len() as u64).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_clamp_bounds_to_unit_square() {
        let bbox = BoundingBox {
            x: -0.2,
            y: 1.5,
            w: 2.0,
            h: -1.0,
        }
        .clamped();
        assert_eq!(bbox.x, 0.0);
        assert_eq!(bbox.y, 1.0);
        assert_eq!(bbox.w, 1.0);
        assert_eq!(bbox.h, 0.0);
    }

    #[test]
    fn vegetation_status_bands() {
        assert_eq!(VegetationStatus::from_overall(85.0), VegetationStatus::Healthy);
        assert_eq!(VegetationStatus::from_overall(55.0), VegetationStatus::Moderate);
        assert_eq!(VegetationStatus::from_overall(20.0), VegetationStatus::Poor);
        assert_eq!(VegetationStatus::from_overall(5.0), VegetationStatus::Unknown);
        // Boundaries are inclusive on the lower edge.
        assert_eq!(VegetationStatus::from_overall(70.0), VegetationStatus::Healthy);
        assert_eq!(VegetationStatus::from_overall(40.0), VegetationStatus::Moderate);
        assert_eq!(VegetationStatus::from_overall(15.0), VegetationStatus::Poor);
    }

    #[test]
    fn coverage_total_is_sum_of_categories() {
        let cov = CategoryCoverage {
            vegetation: 10.0,
            sky: 20.0,
            water: 5.0,
            terrain: 5.0,
            built: 10.0,
        };
        assert_eq!(cov.total(), 50.0);
    }

    #[test]
    fn artifact_serializes_with_kind_tag() {
        let artifact = AnalysisArtifact::Detect(DetectionArtifact { detections: vec![] });
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["kind"], "detect");
    }
}
