//! SCRFD face detector via ONNX Runtime.
//!
//! Implements the SCRFD (Sample and Computation Redistribution for Efficient Face
//! Detection) model with 3-stride anchor-free decoding and NMS post-processing.

use crate::embedder::{session_builder, Accelerator};
use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
pub const SCRFD_DEFAULT_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("detector input size {0} must be a positive multiple of 32")]
    InvalidInputSize(u32),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Output tensor indices for one stride: (score_idx, bbox_idx, kps_idx).
type StrideOutputIndices = (usize, usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    input_size: usize,
    /// Per-stride output indices [(score, bbox, kps)] for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model, running it at `input_size × input_size`.
    pub fn load(
        model_path: &Path,
        input_size: u32,
        accelerator: Accelerator,
    ) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }
        if input_size == 0 || input_size % 32 != 0 {
            return Err(DetectorError::InvalidInputSize(input_size));
        }

        let session = session_builder(accelerator)?.commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            input_size,
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            input_size: input_size as usize,
            stride_indices,
        })
    }

    /// Detect faces in an RGB image, returning boxes sorted by confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        let (input, letterbox) = self.preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();

        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;
            let (_, kps) = outputs[kps_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("kps stride {stride}: {e}")))?;

            all_detections.extend(decode_stride(
                StrideOutputs { scores, bboxes, kps },
                stride,
                self.input_size,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        let mut result = nms(all_detections, SCRFD_NMS_THRESHOLD);
        result.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(result)
    }

    /// Letterbox an RGB image into a NCHW float tensor.
    ///
    /// The image is scaled to fit, centred, and the border is filled with the
    /// mean value so it normalizes to 0.0.
    fn preprocess(&self, image: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
        let size = self.input_size;
        let (width, height) = (image.width() as f32, image.height() as f32);
        let scale = (size as f32 / width).min(size as f32 / height);

        let new_w = ((width * scale).round() as usize).clamp(1, size);
        let new_h = ((height * scale).round() as usize).clamp(1, size);
        let pad_x = (size - new_w) as f32 / 2.0;
        let pad_y = (size - new_h) as f32 / 2.0;

        let resized = imageops::resize(image, new_w as u32, new_h as u32, FilterType::Triangle);

        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        let x0 = pad_x.floor() as usize;
        let y0 = pad_y.floor() as usize;

        for y in 0..size {
            for x in 0..size {
                let inside = y >= y0 && y < y0 + new_h && x >= x0 && x < x0 + new_w;
                let rgb = if inside {
                    let p = resized.get_pixel((x - x0) as u32, (y - y0) as u32);
                    [p[0] as f32, p[1] as f32, p[2] as f32]
                } else {
                    [SCRFD_MEAN; 3]
                };
                for (c, value) in rgb.iter().enumerate() {
                    tensor[[0, c, y, x]] = (value - SCRFD_MEAN) / SCRFD_STD;
                }
            }
        }

        (tensor, LetterboxInfo { scale, pad_x, pad_y })
    }
}

/// Discover output tensor ordering by name.
///
/// SCRFD exports may name tensors "score_8", "bbox_16", ... or use generic
/// numeric names. Falls back to the standard positional ordering:
///   [0-2] = scores, [3-5] = bboxes, [6-8] = kps (strides 8, 16, 32).
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let mut named = [(0usize, 0usize, 0usize); 3];
    for (slot, &stride) in named.iter_mut().zip(SCRFD_STRIDES.iter()) {
        match (find("score", stride), find("bbox", stride), find("kps", stride)) {
            (Some(s), Some(b), Some(k)) => *slot = (s, b, k),
            _ => {
                tracing::info!(
                    ?names,
                    "SCRFD: output names not recognized, using positional mapping"
                );
                return [(0, 3, 6), (1, 4, 7), (2, 5, 8)];
            }
        }
    }
    named
}

/// Raw output slices for one stride level.
struct StrideOutputs<'a> {
    scores: &'a [f32],
    bboxes: &'a [f32],
    kps: &'a [f32],
}

/// Decode detections for a single stride level.
fn decode_stride(
    out: StrideOutputs<'_>,
    stride: usize,
    input_size: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = input_size / stride;
    let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let s = stride as f32;
    let unmap = |x: f32, y: f32| {
        (
            (x - letterbox.pad_x) / letterbox.scale,
            (y - letterbox.pad_y) / letterbox.scale,
        )
    };

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = out.scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let cell = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_x = (cell % grid) as f32 * s;
        let anchor_y = (cell / grid) as f32 * s;

        // [left, top, right, bottom] distances from the anchor, in strides
        let Some(d) = out.bboxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };
        let (x1, y1) = unmap(anchor_x - d[0] * s, anchor_y - d[1] * s);
        let (x2, y2) = unmap(anchor_x + d[2] * s, anchor_y + d[3] * s);

        let landmarks = out.kps.get(idx * 10..idx * 10 + 10).map(|k| {
            std::array::from_fn(|i| unmap(anchor_x + k[i * 2] * s, anchor_y + k[i * 2 + 1] * s))
        });

        detections.push(BoundingBox {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            landmarks,
        });
    }

    detections
}

/// Non-Maximum Suppression: remove overlapping detections.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|kept| iou(kept, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Compute Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter_area = inter_w * inter_h;
    let union_area = a.area() + b.area() - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}
