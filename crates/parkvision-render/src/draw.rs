// SPDX-License-Identifier: Apache-2.0
//! Drawing primitives for boxes, face dots, and labels (spec §4.6).
//!
//! Draw order is fixed (boxes, then face dots, then labels with
//! connectors) so that identical inputs always produce identical pixels —
//! the determinism the spec requires for caching under an `annotate` key.

use ab_glyph::{Font, FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut,
};
use imageproc::rect::Rect;
use parkvision_types::{BoundingBox, Detection, Face};

use crate::style::Style;

fn to_pixel_rect(bbox: BoundingBox, width: u32, height: u32) -> Rect {
    let clamped = bbox.clamped();
    let x = (clamped.x * width as f32).round() as i32;
    let y = (clamped.y * height as f32).round() as i32;
    let w = ((clamped.w * width as f32).round() as u32).max(1);
    let h = ((clamped.h * height as f32).round() as u32).max(1);
    Rect::at(x, y).of_size(w, h)
}

fn to_rgba(color: (u8, u8, u8), alpha: u8) -> Rgba<u8> {
    Rgba([color.0, color.1, color.2, alpha])
}

/// Top-left corner of the label panel, clamped into the canvas (spec §4.6
/// step 3: the label sits just above the box, never off-canvas).
fn label_origin(rect: Rect, text_width: f32, text_height: f32, width: u32, height: u32) -> (i32, i32) {
    let label_x = rect.left().clamp(0, width.saturating_sub(text_width as u32) as i32);
    let label_y = (rect.top() - text_height as i32 - 4).max(0);
    (label_x, label_y)
}

/// Draw a `thickness`-pixel-wide hollow rectangle by nesting hollow rects
/// inward (`imageproc` draws single-pixel outlines).
fn draw_thick_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>, thickness: u32) {
    for inset in 0..thickness.max(1) {
        let inset = inset as i32;
        let width = rect.width().saturating_sub(2 * inset as u32).max(1);
        let height = rect.height().saturating_sub(2 * inset as u32).max(1);
        let inset_rect = Rect::at(rect.left() + inset, rect.top() + inset).of_size(width, height);
        draw_hollow_rect_mut(canvas, inset_rect, color);
    }
}

/// Draw boxes for `detections`, already filtered/sorted/truncated by the
/// caller (spec §4.6 step 1).
pub fn draw_boxes(canvas: &mut RgbaImage, detections: &[Detection], style: &Style) {
    let (width, height) = canvas.dimensions();
    let color = to_rgba(style.box_color, 255);
    for detection in detections {
        let rect = to_pixel_rect(detection.bbox, width, height);
        draw_thick_rect(canvas, rect, color, style.box_thickness);
    }
}

/// Draw a dot at each face-landmark point (spec §4.6 step 2).
pub fn draw_faces(canvas: &mut RgbaImage, faces: &[Face], style: &Style) {
    let (width, height) = canvas.dimensions();
    let color = to_rgba(style.face_marker_color, 255);
    let radius = style.face_marker_radius.max(1) as i32;
    for face in faces {
        for landmark in &face.landmarks {
            let x = (landmark.x.clamp(0.0, 1.0) * width as f32).round() as i32;
            let y = (landmark.y.clamp(0.0, 1.0) * height as f32).round() as i32;
            draw_filled_circle_mut(canvas, (x, y), radius, color);
        }
    }
}

/// Draw a label (with background panel) for `detection` and connect it
/// to the nearest edge of its box with a straight line (spec §4.6 step 3).
pub fn draw_label(canvas: &mut RgbaImage, detection: &Detection, style: &Style, font: &FontArc) {
    let (width, height) = canvas.dimensions();
    let rect = to_pixel_rect(detection.bbox, width, height);

    let text = format!("{} {:.0}%", detection.class_name, detection.confidence * 100.0);
    let scale = PxScale::from(style.label_font_px);
    // Average glyph advance width approximates the common case well enough
    // for background-panel sizing without shaping the whole string twice.
    let average_advance = font.h_advance_unscaled(font.glyph_id('0'))
        * scale.x
        / font.units_per_em().unwrap_or(1000.0);
    let text_width = average_advance * text.chars().count() as f32;
    let text_height = style.label_font_px;

    let (label_x, label_y) = label_origin(rect, text_width, text_height, width, height);

    let bg_rect = Rect::at(label_x, label_y).of_size(
        (text_width as u32 + 6).min(width),
        (text_height as u32 + 4).min(height),
    );
    let bg_alpha = (style.text_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    draw_filled_rect_mut(canvas, bg_rect, to_rgba(style.text_bg, bg_alpha));
    draw_text_mut(
        canvas,
        to_rgba(style.label_color, 255),
        label_x + 3,
        label_y + 2,
        scale,
        font,
        &text,
    );

    let connector_start = (rect.left() + rect.width() as i32 / 2, rect.top());
    let connector_end = (label_x, label_y);
    draw_line_segment_mut(
        canvas,
        (connector_start.0 as f32, connector_start.1 as f32),
        (connector_end.0 as f32, connector_end.1 as f32),
        to_rgba(style.connector_color, 255),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::{Face, Landmark};

    fn blank_canvas() -> RgbaImage {
        RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn box_pixel_rect_scales_to_canvas_dimensions() {
        let bbox = BoundingBox { x: 0.1, y: 0.2, w: 0.3, h: 0.4 };
        let rect = to_pixel_rect(bbox, 100, 100);
        assert_eq!((rect.left(), rect.top()), (10, 20));
        assert_eq!((rect.width(), rect.height()), (30, 40));
    }

    #[test]
    fn draw_boxes_paints_box_color_pixels() {
        let mut canvas = blank_canvas();
        let detection = Detection {
            object_id: 1,
            class_name: "bench".into(),
            confidence: 0.9,
            bbox: BoundingBox { x: 0.1, y: 0.1, w: 0.5, h: 0.5 },
            center: (0.35, 0.35),
            area_pct: 25.0,
        };
        let style = Style::default();
        draw_boxes(&mut canvas, &[detection], &style);
        let expected = to_rgba(style.box_color, 255);
        let top_left = canvas.get_pixel(10, 10);
        assert_eq!(*top_left, expected);
    }

    #[test]
    fn label_origin_sits_above_the_box_with_a_gap() {
        let rect = Rect::at(40, 40).of_size(20, 20);
        let (label_x, label_y) = label_origin(rect, 30.0, 12.0, 100, 100);
        assert_eq!(label_x, 40);
        assert_eq!(label_y, 24);
    }

    #[test]
    fn label_origin_clamps_to_the_canvas_when_the_box_is_near_an_edge() {
        let rect = Rect::at(0, 0).of_size(20, 20);
        let (label_x, label_y) = label_origin(rect, 30.0, 12.0, 100, 100);
        assert_eq!(label_x, 0);
        assert_eq!(label_y, 0);
    }

    #[test]
    fn draw_faces_paints_marker_at_landmark() {
        let mut canvas = blank_canvas();
        let face = Face {
            face_id: 1,
            bbox: BoundingBox { x: 0.0, y: 0.0, w: 0.2, h: 0.2 },
            landmarks: vec![Landmark { kind: "left_eye", x: 0.5, y: 0.5 }],
            anger: parkvision_types::Likelihood::VeryUnlikely,
            joy: parkvision_types::Likelihood::VeryUnlikely,
            sorrow: parkvision_types::Likelihood::VeryUnlikely,
            surprise: parkvision_types::Likelihood::VeryUnlikely,
            blurred: false,
            headwear: false,
        };
        let style = Style::default();
        draw_faces(&mut canvas, &[face], &style);
        assert_eq!(*canvas.get_pixel(50, 50), to_rgba(style.face_marker_color, 255));
    }
}
