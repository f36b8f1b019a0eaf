use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::models::{CariesClass, Choice, Detection};

const BOX_THICKNESS: i32 = 3;
const TAG_HEIGHT: u32 = 8;

/// Box colour for a class label; unknown labels are drawn grey.
pub fn class_color(label: Option<&str>) -> Rgb<u8> {
    match label.and_then(CariesClass::from_label) {
        Some(CariesClass::Healthy) => Rgb([46, 204, 113]),
        Some(CariesClass::Initial) => Rgb([241, 196, 15]),
        Some(CariesClass::Moderate) => Rgb([230, 126, 34]),
        Some(CariesClass::Extensive) => Rgb([231, 76, 60]),
        None => Rgb([149, 165, 166]),
    }
}

/// Copy of `frame` with one coloured box (and a solid tag above it) per detection.
pub fn annotate(frame: &RgbImage, detections: &[Detection], class_names: &[String]) -> RgbImage {
    let mut canvas = frame.clone();
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return canvas;
    }

    for detection in detections {
        let label = class_names.get(detection.class_id).map(String::as_str);
        let color = class_color(label);
        let bbox = &detection.bbox;

        let x = bbox.x1.round() as i32;
        let y = bbox.y1.round() as i32;
        let bw = bbox.width().round().max(1.0) as u32;
        let bh = bbox.height().round().max(1.0) as u32;

        for inset in 0..BOX_THICKNESS {
            let inner_w = bw.saturating_sub(2 * inset as u32);
            let inner_h = bh.saturating_sub(2 * inset as u32);
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x + inset, y + inset).of_size(inner_w, inner_h),
                color,
            );
        }

        // Tag width encodes confidence so the preview stays readable without a font.
        let tag_w = ((bw as f32) * detection.confidence.clamp(0.0, 1.0)).max(1.0) as u32;
        let tag_y = (y - TAG_HEIGHT as i32).max(0);
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(x, tag_y).of_size(tag_w, TAG_HEIGHT),
            color,
        );
    }

    canvas
}
