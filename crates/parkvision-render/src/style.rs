// SPDX-License-Identifier: Apache-2.0
//! Rendering request and style parameters (spec §4.6).

use parkvision_types::ImageFormat;
use serde::{Deserialize, Serialize};

/// An 8-bit RGB color triple.
pub type RgbColor = (u8, u8, u8);

/// Per-request drawing style (spec §4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Style {
    /// Fill color for face-landmark dots.
    pub face_marker_color: RgbColor,
    /// Radius, in pixels, of each face-landmark dot.
    pub face_marker_radius: u32,
    /// Stroke color for detection boxes.
    pub box_color: RgbColor,
    /// Stroke thickness, in pixels, for detection boxes.
    pub box_thickness: u32,
    /// Text color for labels.
    pub label_color: RgbColor,
    /// Label font size, in pixels.
    pub label_font_px: f32,
    /// Stroke color for the connector line from box edge to label.
    pub connector_color: RgbColor,
    /// Fill color for the label's text background panel.
    pub text_bg: RgbColor,
    /// Alpha, `[0, 1]`, for the label text background panel.
    pub text_alpha: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            face_marker_color: (255, 80, 80),
            face_marker_radius: 3,
            box_color: (40, 200, 80),
            box_thickness: 2,
            label_color: (255, 255, 255),
            label_font_px: 14.0,
            connector_color: (200, 200, 200),
            text_bg: (20, 20, 20),
            text_alpha: 0.65,
        }
    }
}

/// A render request (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Whether to draw face-landmark dots.
    pub include_faces: bool,
    /// Whether to draw detection boxes.
    pub include_boxes: bool,
    /// Whether to draw labels and connector lines.
    pub include_labels: bool,
    /// Output encoding format.
    pub format: ImageFormat,
    /// Encoding quality, `1..=100` (ignored for PNG).
    pub quality: u8,
    /// Drawing style.
    pub style: Style,
    /// Detections below this confidence are not drawn.
    pub confidence_threshold: f32,
    /// Maximum number of detections drawn, highest confidence first.
    pub max_objects: usize,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            include_faces: true,
            include_boxes: true,
            include_labels: true,
            format: ImageFormat::Png,
            quality: 90,
            style: Style::default(),
            confidence_threshold: 0.3,
            max_objects: 25,
        }
    }
}
