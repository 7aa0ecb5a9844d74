// SPDX-License-Identifier: Apache-2.0
//! Label categorization and coverage estimation (spec §4.5 steps 1-2).

use parkvision_types::{CategoryCoverage, RawLabel};

/// Labels below this confidence are discarded pre-categorization.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

const VEGETATION_KEYWORDS: &[&str] = &[
    "tree", "plant", "grass", "leaf", "flower", "shrub", "forest", "foliage", "garden", "vegetation",
];
const SKY_KEYWORDS: &[&str] = &[
    "sky", "cloud", "atmosphere", "sunset", "sunrise", "horizon",
];
const WATER_KEYWORDS: &[&str] = &[
    "water", "lake", "river", "pond", "stream", "fountain", "sea", "ocean",
];
const TERRAIN_KEYWORDS: &[&str] = &[
    "ground", "soil", "rock", "path", "trail", "sand", "dirt",
];
const BUILT_KEYWORDS: &[&str] = &[
    "building", "bench", "fence", "structure", "pavement", "road", "wall", "roof",
];

/// The five fixed natural-element categories (spec §4.5 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Vegetation.
    Vegetation,
    /// Sky.
    Sky,
    /// Water.
    Water,
    /// Terrain.
    Terrain,
    /// Built/human-made.
    Built,
}

impl Category {
    /// The per-category damping factor applied to confidence before
    /// accumulation (spec §4.5 step 2 `alpha_kind`).
    pub fn alpha(self) -> f32 {
        match self {
            Self::Vegetation => 1.0,
            Self::Sky => 0.8,
            Self::Water => 0.7,
            Self::Terrain => 0.5,
            Self::Built => 0.6,
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Vegetation => VEGETATION_KEYWORDS,
            Self::Sky => SKY_KEYWORDS,
            Self::Water => WATER_KEYWORDS,
            Self::Terrain => TERRAIN_KEYWORDS,
            Self::Built => BUILT_KEYWORDS,
        }
    }

    const ALL: [Category; 5] = [
        Category::Vegetation,
        Category::Sky,
        Category::Water,
        Category::Terrain,
        Category::Built,
    ];
}

/// Normalize a label for keyword matching: lowercase, trimmed.
fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Categories a normalized label matches, by substring (spec §4.5 step 1).
fn matching_categories(normalized: &str) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|category| category.keywords().iter().any(|kw| normalized.contains(kw)))
        .collect()
}

/// Raw confidence accumulated per category before rescaling, keyed by the
/// same order as [`Category::ALL`].
struct RawAccumulation {
    sums: [f32; 5],
}

impl RawAccumulation {
    fn index_of(category: Category) -> usize {
        Category::ALL.iter().position(|c| *c == category).unwrap_or(0)
    }

    fn add(&mut self, category: Category, weighted_confidence: f32) {
        self.sums[Self::index_of(category)] += weighted_confidence;
    }

    fn get(&self, category: Category) -> f32 {
        self.sums[Self::index_of(category)]
    }
}

/// Estimate per-category coverage percentages from raw labels (spec §4.5
/// steps 1-2). Labels below `confidence_threshold` are discarded. Labels
/// matching more than one category are attributed proportionally: each
/// matched category receives `confidence / match_count`.
pub fn estimate_coverage(labels: &[RawLabel], confidence_threshold: f32) -> CategoryCoverage {
    let mut raw = RawAccumulation { sums: [0.0; 5] };
    let mut total_weighted = 0.0f32;

    for label in labels {
        if label.confidence < confidence_threshold {
            continue;
        }
        let normalized = normalize(&label.description);
        let matches = matching_categories(&normalized);
        if matches.is_empty() {
            continue;
        }
        let share = label.confidence / matches.len() as f32;
        for category in matches {
            let weighted = share * category.alpha();
            raw.add(category, weighted);
            total_weighted += weighted;
        }
    }

    if total_weighted <= 0.0 {
        return CategoryCoverage::default();
    }

    let mut coverage = CategoryCoverage {
        vegetation: 100.0 * (raw.get(Category::Vegetation) / total_weighted).clamp(0.0, 1.0),
        sky: 100.0 * (raw.get(Category::Sky) / total_weighted).clamp(0.0, 1.0),
        water: 100.0 * (raw.get(Category::Water) / total_weighted).clamp(0.0, 1.0),
        terrain: 100.0 * (raw.get(Category::Terrain) / total_weighted).clamp(0.0, 1.0),
        built: 100.0 * (raw.get(Category::Built) / total_weighted).clamp(0.0, 1.0),
    };

    let sum = coverage.total();
    if sum > 100.0 {
        let scale = 100.0 / sum;
        coverage.vegetation *= scale;
        coverage.sky *= scale;
        coverage.water *= scale;
        coverage.terrain *= scale;
        coverage.built *= scale;
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(description: &str, confidence: f32) -> RawLabel {
        RawLabel {
            description: description.into(),
            confidence,
        }
    }

    #[test]
    fn below_threshold_labels_are_discarded() {
        let coverage = estimate_coverage(&[label("tree", 0.1)], DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(coverage.total(), 0.0);
    }

    #[test]
    fn unambiguous_label_fully_attributed() {
        let coverage = estimate_coverage(&[label("tree", 0.9)], DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(coverage.vegetation > 0.0);
        assert_eq!(coverage.sky, 0.0);
    }

    #[test]
    fn coverage_never_exceeds_100() {
        let labels = vec![
            label("tree", 0.9),
            label("grass", 0.9),
            label("forest", 0.9),
            label("sky", 0.9),
            label("cloud", 0.9),
        ];
        let coverage = estimate_coverage(&labels, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(coverage.total() <= 100.0 + 1e-3);
    }

    #[test]
    fn ambiguous_label_splits_between_categories() {
        // "garden path" matches both vegetation ("garden") and terrain ("path").
        let coverage = estimate_coverage(&[label("garden path", 0.8)], DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(coverage.vegetation > 0.0);
        assert!(coverage.terrain > 0.0);
    }
}
