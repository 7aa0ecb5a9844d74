// SPDX-License-Identifier: Apache-2.0
//! Annotation renderer (spec §4.6): decode, draw boxes/face-dots/labels,
//! re-encode. Deterministic given identical pixels and request, which lets
//! the coordinator cache renders under an `annotate` key derived from
//! `(image_hash, param_fingerprint_of_request_including_style)`.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

mod draw;
mod encode;
mod error;
mod stats;
mod style;

pub use error::RenderError;
pub use stats::compute_stats;
pub use style::{RenderRequest, RgbColor, Style};

use ab_glyph::FontArc;
use parkvision_types::{AnnotationStats, Detection, Face};

/// The rendered output: encoded bytes, preserved dimensions, and stats.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Encoded image bytes, in `request.format`.
    pub bytes: Vec<u8>,
    /// Preserved source width.
    pub width: u32,
    /// Preserved source height.
    pub height: u32,
    /// Draw statistics.
    pub stats: AnnotationStats,
}

/// Decodes, draws, and re-encodes images. Holds the label font so callers
/// construct it once (font parsing is the only non-trivial setup cost).
pub struct Renderer {
    font: FontArc,
}

impl Renderer {
    /// Build a renderer from raw TrueType/OpenType font bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidFont`] if `font_bytes` does not parse.
    pub fn new(font_bytes: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontArc::try_from_vec(font_bytes)
            .map_err(|err| RenderError::InvalidFont { message: err.to_string() })?;
        Ok(Self { font })
    }

    /// Render `original_bytes` with `detections`/`faces` overlaid per
    /// `request` (spec §4.6).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Decode`] if the source image cannot be
    /// decoded, or [`RenderError::Encode`] if the drawn canvas cannot be
    /// re-encoded to `request.format`.
    pub fn render(
        &self,
        original_bytes: &[u8],
        detections: &[Detection],
        faces: &[Face],
        request: &RenderRequest,
    ) -> Result<RenderOutput, RenderError> {
        let decoded = image::load_from_memory(original_bytes)
            .map_err(|err| RenderError::Decode { message: err.to_string() })?;
        let mut canvas = decoded.to_rgba8();
        let (width, height) = canvas.dimensions();

        let mut selected: Vec<&Detection> = detections
            .iter()
            .filter(|detection| detection.confidence >= request.confidence_threshold)
            .collect();
        selected.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        selected.truncate(request.max_objects);

        if request.include_boxes {
            let owned: Vec<Detection> = selected.iter().map(|d| (*d).clone()).collect();
            draw::draw_boxes(&mut canvas, &owned, &request.style);
        }
        if request.include_faces {
            draw::draw_faces(&mut canvas, faces, &request.style);
        }
        if request.include_labels {
            for detection in &selected {
                draw::draw_label(&mut canvas, detection, &request.style, &self.font);
            }
        }

        let total_faces = if request.include_faces { faces.len() as u32 } else { 0 };
        let rendered_stats = stats::compute_stats(&selected, total_faces);

        let bytes = encode::encode(&canvas, request.format, request.quality)?;

        Ok(RenderOutput {
            bytes,
            width,
            height,
            stats: rendered_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `Renderer` needs real TrueType font bytes, which the coordinator
    // loads from a configured path at startup (spec §10); there is no such
    // asset available in this crate's test fixtures, so font-dependent
    // drawing is exercised in `draw.rs`'s unit tests and through the
    // geometry/encode/stats helpers directly rather than end-to-end here.

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let result = Renderer::new(b"not a font".to_vec());
        assert!(matches!(result, Err(RenderError::InvalidFont { .. })));
    }
}
