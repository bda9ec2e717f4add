//! Reference profiles from a directory of known faces.
//!
//! Layout: `<known_dir>/<identity>/**/<image>`. Each sample image contributes
//! at most one embedding: its largest face, if big enough.

use crate::photos::{self, PhotoError};
use facefind_core::{DetectedFace, Embedding, FaceEmbedder, ProfileError, ProfileSet};
use std::collections::BTreeMap;
use std::path::Path;

/// The face with the largest box area; the first one wins a tie.
pub fn largest_face(faces: Vec<DetectedFace>) -> Option<DetectedFace> {
    let mut best: Option<DetectedFace> = None;
    for face in faces {
        let bigger = best
            .as_ref()
            .map_or(true, |b| face.bbox.area() > b.bbox.area());
        if bigger {
            best = Some(face);
        }
    }
    best
}

/// The canonical embedding of one sample image, if it has a usable face.
pub fn sample_embedding<E: FaceEmbedder + ?Sized>(
    embedder: &mut E,
    path: &Path,
    min_face_size: u32,
) -> Result<Option<Embedding>, PhotoError> {
    let image = photos::decode(path)?;
    let faces = embedder
        .faces(&image)
        .map_err(|source| PhotoError::Extraction {
            path: path.display().to_string(),
            source,
        })?;

    let Some(face) = largest_face(faces) else {
        tracing::debug!(path = %path.display(), "sample: no face detected");
        return Ok(None);
    };
    if !face.bbox.meets_min_size(min_face_size) {
        tracing::debug!(
            path = %path.display(),
            width = face.bbox.width(),
            height = face.bbox.height(),
            "sample: face below minimum size"
        );
        return Ok(None);
    }
    Ok(Some(face.embedding))
}

/// Build one profile per identity sub-directory of `known_dir`.
///
/// Samples that fail to decode or embed are skipped; identities left without
/// samples are dropped. Fails with [`ProfileError::NoProfiles`] if nothing
/// usable remains.
pub fn build_profiles<E: FaceEmbedder + ?Sized>(
    embedder: &mut E,
    known_dir: &Path,
    min_face_size: u32,
) -> Result<ProfileSet, ProfileError> {
    let io_err = |source| ProfileError::Io {
        path: known_dir.display().to_string(),
        source,
    };

    let mut identities = Vec::new();
    for entry in std::fs::read_dir(known_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            identities.push(entry.path());
        }
    }
    identities.sort();

    let mut samples: BTreeMap<String, Vec<Embedding>> = BTreeMap::new();

    for person_dir in identities {
        let name = person_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let files = match photos::collect_images(&person_dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(identity = %name, error = %e, "cannot read identity directory");
                Vec::new()
            }
        };

        let mut embeddings = Vec::new();
        for path in &files {
            match sample_embedding(embedder, path, min_face_size) {
                Ok(Some(embedding)) => embeddings.push(embedding),
                Ok(None) => {}
                Err(e) => tracing::warn!(identity = %name, error = %e, "skipping sample"),
            }
        }

        tracing::info!(
            identity = %name,
            usable = embeddings.len(),
            samples = files.len(),
            "collected reference samples"
        );
        samples.insert(name, embeddings);
    }

    ProfileSet::from_samples(samples)
}
