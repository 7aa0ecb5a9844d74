// SPDX-License-Identifier: Apache-2.0
//! Vegetation health scoring (spec §4.5 step 3).

use parkvision_types::{RawDominantColor, RawLabel, VegetationHealth, VegetationStatus};

const HEALTHY_LABEL_KEYWORDS: &[&str] = &["lush", "verdant", "healthy", "green", "thriving"];

const COLOR_WEIGHT: f32 = 0.45;
const COVERAGE_WEIGHT: f32 = 0.35;
const LABEL_WEIGHT: f32 = 0.20;

/// Threshold above which a dominant color counts as "green" (spec §4.5
/// step 3: `G > R AND G > B AND G >= 80`).
const GREEN_FLOOR: u8 = 80;

/// Green-ratio ceiling past which `color_score` saturates at 100.
const GREEN_RATIO_CEILING: f32 = 0.4;

/// Vegetation-coverage ceiling past which `coverage_score` saturates at 100.
const COVERAGE_CEILING: f32 = 30.0;

fn is_green(color: &RawDominantColor) -> bool {
    color.g > color.r && color.g > color.b && color.g >= GREEN_FLOOR
}

fn color_score(colors: &[RawDominantColor]) -> f32 {
    if colors.is_empty() {
        return 0.0;
    }
    let green_ratio = colors.iter().filter(|c| is_green(c)).count() as f32 / colors.len() as f32;
    100.0 * (green_ratio / GREEN_RATIO_CEILING).min(1.0)
}

fn coverage_score(vegetation_coverage_pct: f32) -> f32 {
    100.0 * (vegetation_coverage_pct / COVERAGE_CEILING).min(1.0)
}

fn label_score(labels: &[RawLabel]) -> f32 {
    let max_confidence = labels
        .iter()
        .filter(|label| {
            let normalized = label.description.to_lowercase();
            HEALTHY_LABEL_KEYWORDS.iter().any(|kw| normalized.contains(kw))
        })
        .map(|label| label.confidence)
        .fold(0.0f32, f32::max);
    100.0 * max_confidence.min(1.0)
}

/// Recommendation keyed off whichever sub-score is lowest (spec §4.5 step 3
/// "fixed table").
fn recommendations_for(color: f32, coverage: f32, label: f32) -> Vec<String> {
    let mut recs = Vec::new();
    if color < 40.0 {
        recs.push("dominant colors show little healthy green; inspect for drought stress or dieback".to_owned());
    }
    if coverage < 40.0 {
        recs.push("vegetation coverage is low; consider additional plantings".to_owned());
    }
    if label < 40.0 {
        recs.push("no strong healthy-vegetation labels detected; manual inspection recommended".to_owned());
    }
    recs
}

/// Score vegetation health from dominant colors, labels, and the
/// vegetation coverage percentage already computed by
/// [`crate::categorize::estimate_coverage`] (spec §4.5 step 3).
pub fn score_vegetation_health(
    dominant_colors: &[RawDominantColor],
    labels: &[RawLabel],
    vegetation_coverage_pct: f32,
) -> VegetationHealth {
    let color = color_score(dominant_colors);
    let coverage = coverage_score(vegetation_coverage_pct);
    let label = label_score(labels);
    let overall = COLOR_WEIGHT * color + COVERAGE_WEIGHT * coverage + LABEL_WEIGHT * label;

    VegetationHealth {
        color_score: color,
        coverage_score: coverage,
        label_score: label,
        overall,
        status: VegetationStatus::from_overall(overall),
    }
}

/// Fixed-table recommendations for a scored [`VegetationHealth`].
pub fn recommendations(health: &VegetationHealth) -> Vec<String> {
    recommendations_for(health.color_score, health.coverage_score, health.label_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn green(g: u8) -> RawDominantColor {
        RawDominantColor {
            r: 20,
            g,
            b: 20,
            pixel_fraction: 0.5,
        }
    }

    #[test]
    fn all_green_colors_saturate_color_score() {
        let colors = vec![green(200), green(180)];
        assert!((color_score(&colors) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn no_green_colors_scores_zero() {
        let colors = vec![RawDominantColor { r: 200, g: 50, b: 50, pixel_fraction: 1.0 }];
        assert_eq!(color_score(&colors), 0.0);
    }

    #[test]
    fn coverage_saturates_at_ceiling() {
        assert!((coverage_score(60.0) - 100.0).abs() < 1e-3);
        assert!((coverage_score(15.0) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn healthy_label_raises_label_score() {
        let labels = vec![RawLabel { description: "lush lawn".into(), confidence: 0.8 }];
        assert!((label_score(&labels) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn overall_below_15_yields_unknown_status() {
        let health = score_vegetation_health(&[], &[], 0.0);
        assert_eq!(health.status, VegetationStatus::Unknown);
    }

    #[test]
    fn healthy_inputs_yield_healthy_status() {
        let colors = vec![green(200), green(200)];
        let labels = vec![RawLabel { description: "verdant forest".into(), confidence: 0.9 }];
        let health = score_vegetation_health(&colors, &labels, 40.0);
        assert_eq!(health.status, VegetationStatus::Healthy);
    }

    #[test]
    fn low_scores_produce_recommendations() {
        let health = score_vegetation_health(&[], &[], 0.0);
        assert_eq!(recommendations(&health).len(), 3);
    }
}
