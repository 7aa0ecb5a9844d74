// SPDX-License-Identifier: Apache-2.0
//! Perceptual hashing (spec §4.1): a 64-bit DCT reduction over a downsampled
//! grayscale copy of the image, used only for near-duplicate detection.

use image::{imageops::FilterType, DynamicImage, GenericImageView};

const DCT_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

/// Compute the 64-bit perceptual hash of a decoded image, hex-encoded
/// lowercase (16 chars).
///
/// Algorithm: downsample to `DCT_SIZE x DCT_SIZE` grayscale, run a 2D DCT-II,
/// keep the top-left `HASH_SIZE x HASH_SIZE` low-frequency block (excluding
/// the DC term), and set one output bit per coefficient based on whether it
/// exceeds the block's median.
pub fn perceptual_hash(image: &DynamicImage) -> String {
    let small = image
        .resize_exact(DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Triangle)
        .grayscale();

    let mut pixels = [[0.0f64; DCT_SIZE]; DCT_SIZE];
    for y in 0..DCT_SIZE {
        for x in 0..DCT_SIZE {
            // `grayscale()` equalizes R/G/B, so the red channel carries luma.
            let [luma, ..] = small.get_pixel(x as u32, y as u32).0;
            pixels[y][x] = f64::from(luma);
        }
    }

    let dct = dct_2d(&pixels);

    let mut coefficients = Vec::with_capacity(HASH_SIZE * HASH_SIZE - 1);
    for row in dct.iter().take(HASH_SIZE) {
        for &value in row.iter().take(HASH_SIZE) {
            coefficients.push(value);
        }
    }
    // Drop the DC term (index 0): it reflects average brightness, not structure.
    coefficients.remove(0);

    let mut sorted = coefficients.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[sorted.len() / 2];

    let mut bits: u64 = 0;
    for (i, &value) in coefficients.iter().enumerate() {
        if value > median {
            bits |= 1 << i;
        }
    }

    format!("{bits:016x}")
}

fn dct_2d(input: &[[f64; DCT_SIZE]; DCT_SIZE]) -> [[f64; DCT_SIZE]; DCT_SIZE] {
    let mut rows_transformed = [[0.0f64; DCT_SIZE]; DCT_SIZE];
    for (y, row) in input.iter().enumerate() {
        rows_transformed[y] = dct_1d(row);
    }

    let mut output = [[0.0f64; DCT_SIZE]; DCT_SIZE];
    for x in 0..DCT_SIZE {
        let column: [f64; DCT_SIZE] = std::array::from_fn(|y| rows_transformed[y][x]);
        let transformed = dct_1d(&column);
        for y in 0..DCT_SIZE {
            output[y][x] = transformed[y];
        }
    }
    output
}

fn dct_1d(input: &[f64; DCT_SIZE]) -> [f64; DCT_SIZE] {
    let n = DCT_SIZE as f64;
    let mut output = [0.0f64; DCT_SIZE];
    for (k, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &value) in input.iter().enumerate() {
            let angle = std::f64::consts::PI * (i as f64 + 0.5) * k as f64 / n;
            sum += value * angle.cos();
        }
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        *out = sum * scale;
    }
    output
}

/// Hamming distance between two 16-hex-char perceptual hashes.
///
/// Returns `u32::MAX` if either string fails to parse as a 64-bit hex value
/// (malformed input is treated as maximally dissimilar, never a panic).
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    match (u64::from_str_radix(a, 16), u64::from_str_radix(b, 16)) {
        (Ok(a), Ok(b)) => (a ^ b).count_ones(),
        _ => u32::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid_image(value: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            64,
            64,
            Rgba([value, value, value, 255]),
        ))
    }

    #[test]
    fn hamming_distance_of_identical_hashes_is_zero() {
        let hash = perceptual_hash(&solid_image(128));
        assert_eq!(hamming_distance(&hash, &hash), 0);
    }

    #[test]
    fn hamming_distance_handles_malformed_input() {
        assert_eq!(hamming_distance("not-hex", "0".repeat(16).as_str()), u32::MAX);
    }

    #[test]
    fn hash_is_16_hex_chars() {
        let hash = perceptual_hash(&solid_image(50));
        assert_eq!(hash.len(), 16);
    }

    #[test]
    fn similar_images_hash_closer_than_dissimilar() {
        let mut checker = image::RgbaImage::new(64, 64);
        for (x, y, pixel) in checker.enumerate_pixels_mut() {
            let v = if (x / 8 + y / 8) % 2 == 0 { 20 } else { 235 };
            *pixel = Rgba([v, v, v, 255]);
        }
        let checker_img = DynamicImage::ImageRgba8(checker);
        let near_identical = checker_img.clone();
        let solid = solid_image(128);

        let hash_a = perceptual_hash(&checker_img);
        let hash_b = perceptual_hash(&near_identical);
        let hash_c = perceptual_hash(&solid);

        assert!(hamming_distance(&hash_a, &hash_b) <= hamming_distance(&hash_a, &hash_c));
    }
}
