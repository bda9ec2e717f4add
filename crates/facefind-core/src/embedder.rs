//! The detector/embedder seam.
//!
//! Matching only needs "faces with boxes and embeddings" for a decoded image.
//! [`FaceEmbedder`] is that contract; [`OnnxFaceEmbedder`] is the bundled
//! SCRFD + ArcFace implementation.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::DetectedFace;
use image::RgbImage;
use ort::session::builder::SessionBuilder;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// SCRFD detection model file name inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("embedder error: {0}")]
    Other(String),
}

/// Anything that can find faces in an image and embed them.
///
/// Embeddings need not be normalized. No ordering is promised across faces.
pub trait FaceEmbedder {
    fn faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError>;
}

impl<T: FaceEmbedder + ?Sized> FaceEmbedder for Box<T> {
    fn faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
        (**self).faces(image)
    }
}

/// Preferred ONNX Runtime execution provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accelerator::Cpu => f.write_str("cpu"),
            Accelerator::Gpu => f.write_str("gpu"),
        }
    }
}

impl FromStr for Accelerator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Accelerator::Cpu),
            "gpu" | "cuda" => Ok(Accelerator::Gpu),
            other => Err(format!("unknown accelerator '{other}' (expected cpu or gpu)")),
        }
    }
}

/// Session builder shared by the detector and recognizer.
///
/// GPU is honoured only when built with the `cuda` feature and the runtime
/// reports CUDA as available; otherwise inference stays on the CPU.
pub(crate) fn session_builder(accelerator: Accelerator) -> Result<SessionBuilder, ort::Error> {
    #[allow(unused_mut)]
    let mut builder = Session::builder()?.with_intra_threads(2)?;

    match accelerator {
        Accelerator::Cpu => {}
        #[cfg(feature = "cuda")]
        Accelerator::Gpu => {
            use ort::ep::{self, ExecutionProvider};
            let cuda = ep::CUDA::default();
            if matches!(cuda.is_available(), Ok(true)) {
                if let Err(e) = cuda.register(&mut builder) {
                    tracing::warn!(error = %e, "CUDA registration failed; using CPU");
                }
            } else {
                tracing::warn!("onnx runtime not compiled with CUDA; using CPU");
            }
        }
        #[cfg(not(feature = "cuda"))]
        Accelerator::Gpu => {
            tracing::warn!("GPU requested but facefind was built without the `cuda` feature; using CPU");
        }
    }

    Ok(builder)
}

/// SCRFD detection followed by ArcFace embedding of every detected face.
pub struct OnnxFaceEmbedder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEmbedder {
    /// Load both models from `model_dir`.
    pub fn load(
        model_dir: &Path,
        detector_input_size: u32,
        accelerator: Accelerator,
    ) -> Result<Self, EmbedderError> {
        let detector = FaceDetector::load(
            &model_dir.join(DETECTOR_MODEL_FILE),
            detector_input_size,
            accelerator,
        )?;
        let recognizer =
            FaceRecognizer::load(&model_dir.join(RECOGNIZER_MODEL_FILE), accelerator)?;
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
        let boxes = self.detector.detect(image)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let embedding = self.recognizer.extract(image, &bbox)?;
            faces.push(DetectedFace { bbox, embedding });
        }
        Ok(faces)
    }
}
