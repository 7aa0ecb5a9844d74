// SPDX-License-Identifier: Apache-2.0
//! Re-encoding the drawn canvas to the requested output format (spec §4.6).

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use parkvision_types::ImageFormat;

use crate::error::RenderError;

/// Encode `canvas` to `format` at `quality` (`1..=100`, ignored for PNG).
pub fn encode(canvas: &RgbaImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, RenderError> {
    let (width, height) = canvas.dimensions();
    match format {
        ImageFormat::Png => {
            let mut bytes = Vec::new();
            PngEncoder::new(&mut bytes)
                .write_image(canvas, width, height, ExtendedColorType::Rgba8)
                .map_err(|err| RenderError::Encode { message: err.to_string() })?;
            Ok(bytes)
        }
        ImageFormat::Jpg => {
            let mut bytes = Vec::new();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
                .write_image(canvas, width, height, ExtendedColorType::Rgba8)
                .map_err(|err| RenderError::Encode { message: err.to_string() })?;
            Ok(bytes)
        }
        ImageFormat::Webp => {
            let encoder = webp::Encoder::from_rgba(canvas.as_raw(), width, height);
            let encoded = encoder.encode(f32::from(quality.clamp(1, 100)));
            Ok(encoded.to_vec())
        }
    }
}
