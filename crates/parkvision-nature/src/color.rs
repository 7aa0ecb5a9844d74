// SPDX-License-Identifier: Apache-2.0
//! Color analysis: naming and diversity scoring (spec §4.5 step 5).

use parkvision_types::{ColorAnalysis, DominantColor, RawDominantColor};

struct NamedColor {
    name: &'static str,
    rgb: (u8, u8, u8),
}

const PALETTE: &[NamedColor] = &[
    NamedColor { name: "black", rgb: (0, 0, 0) },
    NamedColor { name: "white", rgb: (255, 255, 255) },
    NamedColor { name: "gray", rgb: (128, 128, 128) },
    NamedColor { name: "red", rgb: (220, 20, 20) },
    NamedColor { name: "orange", rgb: (255, 140, 0) },
    NamedColor { name: "yellow", rgb: (230, 220, 30) },
    NamedColor { name: "green", rgb: (40, 160, 40) },
    NamedColor { name: "cyan", rgb: (40, 200, 200) },
    NamedColor { name: "blue", rgb: (30, 80, 220) },
    NamedColor { name: "purple", rgb: (140, 40, 180) },
    NamedColor { name: "pink", rgb: (230, 140, 180) },
    NamedColor { name: "brown", rgb: (110, 70, 40) },
];

fn distance_sq(a: (u8, u8, u8), b: (u8, u8, u8)) -> i32 {
    let dr = i32::from(a.0) - i32::from(b.0);
    let dg = i32::from(a.1) - i32::from(b.1);
    let db = i32::from(a.2) - i32::from(b.2);
    dr * dr + dg * dg + db * db
}

fn nearest_named(rgb: (u8, u8, u8)) -> &'static str {
    PALETTE
        .iter()
        .min_by_key(|candidate| distance_sq(candidate.rgb, rgb))
        .map_or("unknown", |candidate| candidate.name)
}

fn to_hex(rgb: (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.0, rgb.1, rgb.2)
}

/// Shannon entropy of a probability distribution, in bits.
fn entropy_bits(probabilities: &[f32]) -> f32 {
    probabilities
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

/// Name dominant colors and compute the diversity score (spec §4.5 step 5).
pub fn analyze_colors(raw: &[RawDominantColor]) -> ColorAnalysis {
    let mut dominant_colors: Vec<DominantColor> = raw
        .iter()
        .map(|color| {
            let rgb = (color.r, color.g, color.b);
            DominantColor {
                hex: to_hex(rgb),
                rgb,
                pct: color.pixel_fraction * 100.0,
                name: nearest_named(rgb),
            }
        })
        .collect();
    dominant_colors.sort_by(|a, b| b.pct.partial_cmp(&a.pct).unwrap_or(std::cmp::Ordering::Equal));

    let k = raw.len();
    let diversity_score = if k <= 1 {
        0.0
    } else {
        let probabilities: Vec<f32> = raw.iter().map(|c| c.pixel_fraction).collect();
        100.0 * entropy_bits(&probabilities) / (k as f32).log2()
    };

    ColorAnalysis {
        dominant_colors,
        diversity_score: diversity_score.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(r: u8, g: u8, b: u8, pixel_fraction: f32) -> RawDominantColor {
        RawDominantColor { r, g, b, pixel_fraction }
    }

    #[test]
    fn pure_green_names_as_green() {
        let analysis = analyze_colors(&[color(30, 170, 30, 1.0)]);
        assert_eq!(analysis.dominant_colors[0].name, "green");
        assert_eq!(analysis.dominant_colors[0].hex, "#1eaa1e");
    }

    #[test]
    fn single_color_has_zero_diversity() {
        let analysis = analyze_colors(&[color(0, 0, 0, 1.0)]);
        assert_eq!(analysis.diversity_score, 0.0);
    }

    #[test]
    fn uniform_distribution_maximizes_diversity() {
        let analysis = analyze_colors(&[
            color(255, 0, 0, 0.5),
            color(0, 255, 0, 0.5),
        ]);
        assert!((analysis.diversity_score - 100.0).abs() < 1.0);
    }

    #[test]
    fn dominant_colors_sorted_descending_by_pct() {
        let analysis = analyze_colors(&[color(0, 0, 0, 0.1), color(255, 255, 255, 0.9)]);
        assert!(analysis.dominant_colors[0].pct >= analysis.dominant_colors[1].pct);
    }
}
