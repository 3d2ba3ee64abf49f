#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Tract-based object detector.
///
/// Loads a YOLO-export-style ONNX model whose output rows are
/// `(cx, cy, w, h, confidence, class)` in model-input coordinates. Rows
/// below the confidence threshold are discarded, overlapping boxes are
/// suppressed with greedy IoU NMS, and survivors are rescaled into
/// original-frame pixel coordinates.
pub struct TractDetector {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
}

impl TractDetector {
    /// Load an ONNX detection model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| {
                format!(
                    "failed to load ONNX detection model from {}",
                    model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set detection model input fact")?
            .into_optimized()
            .context("failed to optimize detection model")?
            .into_runnable()
            .context("failed to build runnable detection model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let resized = resize_rgb(
            pixels,
            width as usize,
            height as usize,
            self.input_width as usize,
            self.input_height as usize,
        );

        let input_width = self.input_width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, input_width),
            |(_, channel, y, x)| {
                let idx = (y * input_width + x) * 3 + channel;
                resized[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn parse_output(
        &self,
        outputs: TVec<TValue>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("detection model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("detection model output tensor was not f32")?;

        let shape = view.shape().to_vec();
        let flat: Vec<f32> = view.iter().copied().collect();
        let row_len = *shape
            .last()
            .ok_or_else(|| anyhow!("detection output has no dimensions"))?;
        if row_len < 6 || flat.len() % row_len != 0 {
            return Err(anyhow!(
                "unexpected detection output shape {:?}; expected rows of (cx, cy, w, h, conf, class)",
                shape
            ));
        }

        // Boxes come out in model-input coordinates; map back to the frame.
        let scale_x = frame_width as f32 / self.input_width as f32;
        let scale_y = frame_height as f32 / self.input_height as f32;

        let mut candidates = Vec::new();
        for row in flat.chunks_exact(row_len) {
            let confidence = row[4];
            if confidence < self.confidence_threshold {
                continue;
            }
            let bbox = match BoundingBox::new(
                row[0] * scale_x,
                row[1] * scale_y,
                row[2] * scale_x,
                row[3] * scale_y,
            ) {
                Ok(bbox) => bbox,
                // Degenerate rows (zero extent) are model noise; skip them.
                Err(_) => continue,
            };
            let class_index = row[5].round() as usize;
            let label = COCO_LABELS
                .get(class_index)
                .copied()
                .unwrap_or("object")
                .to_string();
            candidates.push(Detection::new(bbox, label, confidence));
        }

        Ok(nms(candidates, NMS_IOU_THRESHOLD))
    }
}

impl DetectorBackend for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("detection inference failed")?;
        self.parse_output(outputs, width, height)
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    'outer: for candidate in detections {
        for existing in &kept {
            if existing.bbox.iou(&candidate.bbox) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }
    kept
}

/// Nearest-neighbor RGB resize into the model input geometry.
fn resize_rgb(
    pixels: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    if src_w == dst_w && src_h == dst_h {
        return pixels.to_vec();
    }
    let mut out = vec![0u8; dst_w * dst_h * 3];
    for y in 0..dst_h {
        let sy = y * src_h / dst_h;
        for x in 0..dst_w {
            let sx = x * src_w / dst_w;
            let src = (sy * src_w + sx) * 3;
            let dst = (y * dst_w + x) * 3;
            out[dst..dst + 3].copy_from_slice(&pixels[src..src + 3]);
        }
    }
    out
}

/// COCO class labels, indexed by model class id.
const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn det(cx: f32, conf: f32) -> Detection {
        Detection::new(
            BoundingBox::new(cx, 50.0, 20.0, 20.0).unwrap(),
            "person",
            conf,
        )
    }

    #[test]
    fn nms_keeps_highest_confidence_of_overlapping_boxes() {
        let kept = nms(vec![det(50.0, 0.6), det(52.0, 0.9), det(200.0, 0.5)], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn resize_preserves_identity_dimensions() {
        let pixels: Vec<u8> = (0..4 * 4 * 3).map(|v| v as u8).collect();
        assert_eq!(resize_rgb(&pixels, 4, 4, 4, 4), pixels);
        assert_eq!(resize_rgb(&pixels, 4, 4, 2, 2).len(), 2 * 2 * 3);
    }
}
