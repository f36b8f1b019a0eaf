use image::{Rgb, RgbImage, imageops};

use crate::models::{BoundingBox, Detection};

/// Letterbox fill used by the YOLO exporters.
const PAD_VALUE: u8 = 114;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// How a frame was scaled and padded into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Letterbox {
    /// Map a box from model-input space back into the original frame.
    pub fn unmap(&self, bbox: BoundingBox) -> BoundingBox {
        let w = self.frame_width as f32;
        let h = self.frame_height as f32;
        let fx = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, w);
        let fy = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, h);
        BoundingBox {
            x1: fx(bbox.x1),
            y1: fy(bbox.y1),
            x2: fx(bbox.x2),
            y2: fy(bbox.y2),
        }
    }
}

/// Resize keeping aspect ratio, centred on a grey square canvas.
pub fn letterbox(frame: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (w, h) = frame.dimensions();
    let scale = (size as f32 / w.max(1) as f32).min(size as f32 / h.max(1) as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let resized = imageops::resize(frame, new_w, new_h, imageops::FilterType::Triangle);

    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, pad_x.into(), pad_y.into());

    (
        canvas,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            frame_width: w,
            frame_height: h,
        },
    )
}

/// Planar CHW floats in [0, 1], the layout the model expects.
pub fn to_chw(image: &RgbImage) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (x, y, pixel) in image.enumerate_pixels() {
        let idx = (y * w + x) as usize;
        data[idx] = pixel[0] as f32 / 255.0;
        data[plane + idx] = pixel[1] as f32 / 255.0;
        data[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }
    data
}

/// Decode a YOLOv8/11 head of shape `[4 + classes, anchors]` (row-major).
/// Rows 0..4 are centre x, centre y, width, height in input pixels; the rest
/// are per-class scores.
pub fn decode_output(
    output: &[f32],
    rows: usize,
    anchors: usize,
    params: &YoloParams,
    letterbox: &Letterbox,
) -> anyhow::Result<Vec<Detection>> {
    if rows <= 4 {
        anyhow::bail!("model output has {} rows, expected box + class scores", rows);
    }
    if output.len() != rows * anchors {
        anyhow::bail!(
            "model output has {} values, expected {}x{}",
            output.len(),
            rows,
            anchors
        );
    }
    let at = |row: usize, col: usize| output[row * anchors + col];

    let mut candidates = Vec::new();
    for col in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..rows - 4 {
            let score = at(4 + class_id, col);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }
        if best_score < params.conf_threshold {
            continue;
        }

        let (cx, cy, bw, bh) = (at(0, col), at(1, col), at(2, col), at(3, col));
        let input_box = BoundingBox {
            x1: cx - bw / 2.0,
            y1: cy - bh / 2.0,
            x2: cx + bw / 2.0,
            y2: cy + bh / 2.0,
        };
        candidates.push(Detection {
            class_id: best_class,
            confidence: best_score,
            bbox: letterbox.unmap(input_box),
        });
    }

    Ok(nms(candidates, params.iou_threshold, params.max_detections))
}

/// Class-aware non-maximum suppression, highest confidence first.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: usize, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BoundingBox { x1, y1, x2, y2 },
        }
    }

    fn identity_letterbox(size: u32) -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            frame_width: size,
            frame_height: size,
        }
    }

    #[test]
    fn nms_keeps_best_of_overlapping_same_class() {
        let kept = nms(
            vec![
                det(0, 0.6, 0.0, 0.0, 10.0, 10.0),
                det(0, 0.9, 1.0, 1.0, 11.0, 11.0),
                det(1, 0.5, 1.0, 1.0, 11.0, 11.0),
            ],
            0.45,
            100,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_id, 1);
    }

    #[test]
    fn nms_respects_max_detections() {
        let dets = (0..10)
            .map(|i| {
                let x = i as f32 * 20.0;
                det(0, 0.5, x, 0.0, x + 10.0, 10.0)
            })
            .collect();
        assert_eq!(nms(dets, 0.45, 3).len(), 3);
    }

    #[test]
    fn decode_picks_best_class_and_drops_low_scores() {
        // 2 classes, 3 anchors.
        let anchors = 3;
        #[rustfmt::skip]
        let output = vec![
            // cx
            50.0, 150.0, 250.0,
            // cy
            50.0, 50.0, 50.0,
            // w
            20.0, 20.0, 20.0,
            // h
            20.0, 20.0, 20.0,
            // class 0
            0.9, 0.1, 0.05,
            // class 1
            0.2, 0.8, 0.1,
        ];
        let params = YoloParams::default();
        let dets = decode_output(&output, 6, anchors, &params, &identity_letterbox(640)).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[0].bbox, BoundingBox { x1: 40.0, y1: 40.0, x2: 60.0, y2: 60.0 });
    }

    #[test]
    fn decode_rejects_mismatched_shape() {
        let params = YoloParams::default();
        assert!(decode_output(&[0.0; 10], 6, 3, &params, &identity_letterbox(640)).is_err());
    }

    #[test]
    fn letterbox_round_trips_box_into_frame_space() {
        let frame = RgbImage::new(200, 100);
        let (input, lb) = letterbox(&frame, 640);
        assert_eq!(input.dimensions(), (640, 640));
        assert_eq!(lb.scale, 3.2);
        assert_eq!(lb.pad_y, 160.0);

        let mapped = lb.unmap(BoundingBox { x1: 0.0, y1: 160.0, x2: 320.0, y2: 480.0 });
        assert_eq!(mapped, BoundingBox { x1: 0.0, y1: 0.0, x2: 100.0, y2: 100.0 });
    }

    #[test]
    fn chw_layout_splits_channels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(1, 0, Rgb([255, 0, 51]));
        let data = to_chw(&img);
        assert_eq!(data.len(), 6);
        assert_eq!(data[1], 1.0);
        assert_eq!(data[3], 0.0);
        assert!((data[5] - 0.2).abs() < 1e-6);
    }
}
