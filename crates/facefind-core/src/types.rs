use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
///
/// Corners are in pixel coordinates of the image the detector was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Box from corner coordinates, without landmarks.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence: 1.0,
            landmarks: None,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box area; degenerate boxes report 0.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Corners truncated to whole pixels.
    pub fn pixel_rect(&self) -> (i32, i32, i32, i32) {
        (self.x1 as i32, self.y1 as i32, self.x2 as i32, self.y2 as i32)
    }

    /// Whether the pixel box is at least `min_size` wide and tall.
    pub fn meets_min_size(&self, min_size: u32) -> bool {
        let (x1, y1, x2, y2) = self.pixel_rect();
        let min = min_size as i64;
        (x2 as i64 - x1 as i64) >= min && (y2 as i64 - y1 as i64) >= min
    }
}

/// Face embedding vector (512-dimensional for ArcFace, opaque to matching).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn zeros(dim: usize) -> Self {
        Self {
            values: vec![0.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// L2 norm of the vector.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Unit-length copy of this embedding. A zero vector is returned unchanged.
    pub fn normalized(&self) -> Embedding {
        let norm = self.norm();
        if norm > 0.0 {
            Embedding {
                values: self.values.iter().map(|x| x / norm).collect(),
            }
        } else {
            self.clone()
        }
    }

    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. If either vector has
    /// zero magnitude the similarity is 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            (dot / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// One face found by a [`FaceEmbedder`](crate::embedder::FaceEmbedder).
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// A named reference embedding for one known person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub name: String,
    /// Unit length unless the aggregate of its samples was the zero vector.
    pub reference: Embedding,
    /// Number of sample embeddings aggregated into `reference`.
    pub samples: usize,
}

/// A detected face classified as a known identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub bbox: BoundingBox,
    pub identity: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = emb(&[1.0, 0.0, 0.0]);
        let b = emb(&[1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_self_non_unit() {
        let v = emb(&[3.0, -4.0, 12.0]);
        assert!((v.similarity(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = emb(&[1.0, 2.0]);
        let b = emb(&[-1.0, -2.0]);
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
        assert_eq!(b.similarity(&a), 0.0);
    }

    #[test]
    fn test_cosine_similarity_symmetric() {
        let a = emb(&[0.3, -0.2, 0.9]);
        let b = emb(&[0.1, 0.8, -0.4]);
        assert_eq!(a.similarity(&b), b.similarity(&a));
    }

    #[test]
    fn test_normalized_unit_length() {
        let v = emb(&[3.0, 4.0]).normalized();
        assert!((v.values[0] - 0.6).abs() < 1e-6);
        assert!((v.values[1] - 0.8).abs() < 1e-6);
        assert!((v.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_zero_stays_zero() {
        let v = Embedding::zeros(4).normalized();
        assert_eq!(v.values, vec![0.0; 4]);
    }

    #[test]
    fn test_bbox_min_size_uses_pixel_rect() {
        // 59.9 wide truncates to 59 pixels
        let b = BoundingBox::from_corners(10.0, 10.0, 69.9, 80.0);
        assert!(!b.meets_min_size(60));
        let b = BoundingBox::from_corners(10.0, 10.0, 70.0, 70.0);
        assert!(b.meets_min_size(60));
    }

    #[test]
    fn test_bbox_area() {
        let b = BoundingBox::from_corners(0.0, 0.0, 10.0, 20.0);
        assert_eq!(b.area(), 200.0);
        let inverted = BoundingBox::from_corners(10.0, 0.0, 0.0, 20.0);
        assert_eq!(inverted.area(), 0.0);
    }
}
