//! facefind-core — Face identity matching engine.
//!
//! Builds per-identity reference profiles from sample embeddings and classifies
//! detected faces against them by cosine similarity. Ships an SCRFD + ArcFace
//! [`FaceEmbedder`] running via ONNX Runtime.

pub mod alignment;
pub mod detector;
pub mod embedder;
pub mod matcher;
pub mod profile;
pub mod recognizer;
pub mod types;

pub use detector::FaceDetector;
pub use embedder::{Accelerator, EmbedderError, FaceEmbedder, OnnxFaceEmbedder};
pub use matcher::{CosineMatcher, Matcher};
pub use profile::{ProfileError, ProfileSet};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, DetectedFace, Embedding, IdentityProfile, Match};

/// Default model directory: the InsightFace `buffalo_l` pack under the user's home.
pub fn default_model_dir() -> std::path::PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    std::path::PathBuf::from(home).join(".insightface/models/buffalo_l")
}
