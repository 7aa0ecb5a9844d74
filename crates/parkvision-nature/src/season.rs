// SPDX-License-Identifier: Apache-2.0
//! Seasonal inference (spec §4.5 step 4).

use parkvision_types::{RawLabel, Season, SeasonalAnalysis};

/// A season is inferred only if its summed confidence reaches this floor.
pub const PRIMARY_SEASON_THRESHOLD: f32 = 0.4;

const SPRING_KEYWORDS: &[&str] = &["blossom", "bloom", "sprout"];
const SUMMER_KEYWORDS: &[&str] = &["lush", "verdant", "sunflower"];
const AUTUMN_KEYWORDS: &[&str] = &["foliage", "red leaf", "orange", "pumpkin"];
const WINTER_KEYWORDS: &[&str] = &["snow", "frost", "bare branch"];

const SEASONS: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

fn keywords(season: Season) -> &'static [&'static str] {
    match season {
        Season::Spring => SPRING_KEYWORDS,
        Season::Summer => SUMMER_KEYWORDS,
        Season::Autumn => AUTUMN_KEYWORDS,
        Season::Winter => WINTER_KEYWORDS,
        Season::Unknown => &[],
    }
}

/// Alphabetical rank used to break ties (spec §4.5 step 4: "then
/// alphabetical order").
fn alphabetical_rank(season: Season) -> &'static str {
    match season {
        Season::Autumn => "autumn",
        Season::Spring => "spring",
        Season::Summer => "summer",
        Season::Winter => "winter",
        Season::Unknown => "unknown",
    }
}

/// Infer the dominant season from raw labels (spec §4.5 step 4).
pub fn infer_season(labels: &[RawLabel]) -> SeasonalAnalysis {
    let mut confidences = [0.0f32; 4];
    let mut counts = [0u32; 4];
    let mut features_by_season: [Vec<String>; 4] = Default::default();

    for label in labels {
        let normalized = label.description.to_lowercase();
        for (index, season) in SEASONS.iter().enumerate() {
            if keywords(*season).iter().any(|kw| normalized.contains(kw)) {
                confidences[index] += label.confidence;
                counts[index] += 1;
                features_by_season[index].push(label.description.clone());
            }
        }
    }

    let best_index = (0..4)
        .filter(|&i| confidences[i] >= PRIMARY_SEASON_THRESHOLD)
        .max_by(|&a, &b| {
            confidences[a]
                .partial_cmp(&confidences[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(counts[a].cmp(&counts[b]))
                .then(alphabetical_rank(SEASONS[b]).cmp(alphabetical_rank(SEASONS[a])))
        });

    let primary = best_index.map_or(Season::Unknown, |i| SEASONS[i]);
    let features = best_index.map(|i| features_by_season[i].clone()).unwrap_or_default();

    SeasonalAnalysis {
        primary,
        confidences_by_season: [
            (Season::Spring, confidences[0]),
            (Season::Summer, confidences[1]),
            (Season::Autumn, confidences[2]),
            (Season::Winter, confidences[3]),
        ],
        features,
    }
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
    fn no_labels_yields_unknown() {
        assert_eq!(infer_season(&[]).primary, Season::Unknown);
    }

    #[test]
    fn below_threshold_yields_unknown() {
        let result = infer_season(&[label("snow", 0.2)]);
        assert_eq!(result.primary, Season::Unknown);
    }

    #[test]
    fn single_strong_season_wins() {
        let result = infer_season(&[label("fresh snow", 0.9)]);
        assert_eq!(result.primary, Season::Winter);
        assert_eq!(result.features, vec!["fresh snow".to_owned()]);
    }

    #[test]
    fn tie_breaks_by_count_then_alphabetical() {
        // Equal confidence, autumn has more matching labels.
        let result = infer_season(&[
            label("orange pumpkin", 0.3),
            label("foliage", 0.1),
            label("fresh snow", 0.4),
        ]);
        assert_eq!(result.primary, Season::Autumn);
    }

    #[test]
    fn tie_in_confidence_and_count_breaks_alphabetically() {
        // Spring and autumn each get one matching label at the same
        // confidence; "autumn" sorts before "spring".
        let result = infer_season(&[label("bloom", 0.5), label("foliage", 0.5)]);
        assert_eq!(result.primary, Season::Autumn);
    }
}
