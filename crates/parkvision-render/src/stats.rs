// SPDX-License-Identifier: Apache-2.0
//! Render statistics (spec §4.6): class histogram and confidence buckets.

use std::collections::BTreeMap;

use parkvision_types::{AnnotationStats, ConfidenceStats, Detection};

/// Confidence floor for the "high" bucket.
const HIGH_THRESHOLD: f32 = 0.8;
/// Confidence floor for the "medium" bucket.
const MEDIUM_THRESHOLD: f32 = 0.5;

/// Summarize the detections actually drawn onto the canvas (spec §4.6).
pub fn compute_stats(drawn: &[&Detection], total_faces: u32) -> AnnotationStats {
    let mut class_histogram: BTreeMap<String, u32> = BTreeMap::new();
    let mut high = 0u32;
    let mut medium = 0u32;
    let mut low = 0u32;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f32;

    for detection in drawn {
        *class_histogram.entry(detection.class_name.clone()).or_insert(0) += 1;
        sum += detection.confidence;
        min = min.min(detection.confidence);
        max = max.max(detection.confidence);
        if detection.confidence >= HIGH_THRESHOLD {
            high += 1;
        } else if detection.confidence >= MEDIUM_THRESHOLD {
            medium += 1;
        } else {
            low += 1;
        }
    }

    let count = drawn.len();
    let confidence_stats = if count == 0 {
        ConfidenceStats::default()
    } else {
        ConfidenceStats {
            mean: sum / count as f32,
            min,
            max,
            high,
            medium,
            low,
        }
    };

    AnnotationStats {
        total_objects: count as u32,
        total_faces,
        class_histogram,
        confidence_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::BoundingBox;

    fn detection(class_name: &str, confidence: f32) -> Detection {
        Detection {
            object_id: 1,
            class_name: class_name.into(),
            confidence,
            bbox: BoundingBox { x: 0.0, y: 0.0, w: 0.1, h: 0.1 },
            center: (0.05, 0.05),
            area_pct: 1.0,
        }
    }

    #[test]
    fn empty_drawn_set_has_zeroed_stats() {
        let stats = compute_stats(&[], 0);
        assert_eq!(stats.total_objects, 0);
        assert_eq!(stats.confidence_stats.mean, 0.0);
    }

    #[test]
    fn buckets_classify_by_threshold() {
        let bench = detection("bench", 0.9);
        let tree = detection("tree", 0.6);
        let path = detection("path", 0.2);
        let drawn = vec![&bench, &tree, &path];
        let stats = compute_stats(&drawn, 2);
        assert_eq!(stats.confidence_stats.high, 1);
        assert_eq!(stats.confidence_stats.medium, 1);
        assert_eq!(stats.confidence_stats.low, 1);
        assert_eq!(stats.total_faces, 2);
    }

    #[test]
    fn class_histogram_counts_per_class() {
        let a = detection("bench", 0.9);
        let b = detection("bench", 0.7);
        let drawn = vec![&a, &b];
        let stats = compute_stats(&drawn, 0);
        assert_eq!(stats.class_histogram.get("bench"), Some(&2));
    }
}
