//! Identity profiles: per-person reference embeddings and bulk similarity.
//!
//! A [`ProfileSet`] is built once per run from the sample embeddings of each
//! known person and is immutable afterwards. References are kept both as
//! named profiles (sorted by name) and stacked into an `N × D` matrix so a
//! probe can be scored against every identity with one matrix-vector product.

use crate::types::{Embedding, IdentityProfile};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("no reference profiles available — no identity produced a usable sample face")]
    NoProfiles,
    #[error("duplicate identity name: {0}")]
    DuplicateIdentity(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("reading known faces at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Element-wise mean of `samples`, re-normalized to unit length.
///
/// A zero mean is returned as the zero vector. Returns `None` for an empty slice.
pub fn aggregate(samples: &[Embedding]) -> Result<Option<Embedding>, ProfileError> {
    let Some(first) = samples.first() else {
        return Ok(None);
    };
    let dim = first.dim();

    let mut sum = vec![0.0f32; dim];
    for sample in samples {
        if sample.dim() != dim {
            return Err(ProfileError::DimensionMismatch {
                expected: dim,
                actual: sample.dim(),
            });
        }
        for (acc, v) in sum.iter_mut().zip(&sample.values) {
            *acc += v;
        }
    }

    let count = samples.len() as f32;
    let mean = Embedding::new(sum.into_iter().map(|v| v / count).collect());
    Ok(Some(mean.normalized()))
}

/// The immutable set of identity profiles for one matching run.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    /// Sorted by name; row `i` of `references` belongs to `profiles[i]`.
    profiles: Vec<IdentityProfile>,
    references: Array2<f32>,
    norms: Vec<f32>,
}

impl ProfileSet {
    /// Build profiles from each identity's sample embeddings.
    ///
    /// Identities with no samples are left out. Fails with
    /// [`ProfileError::NoProfiles`] if nothing remains.
    pub fn from_samples(
        samples: BTreeMap<String, Vec<Embedding>>,
    ) -> Result<Self, ProfileError> {
        let mut profiles = Vec::with_capacity(samples.len());

        for (name, embeddings) in samples {
            match aggregate(&embeddings)? {
                Some(reference) => {
                    tracing::debug!(
                        identity = %name,
                        samples = embeddings.len(),
                        zero_reference = reference.norm() == 0.0,
                        "built identity profile"
                    );
                    profiles.push(IdentityProfile {
                        name,
                        reference,
                        samples: embeddings.len(),
                    });
                }
                None => {
                    tracing::warn!(identity = %name, "no usable sample faces; identity excluded");
                }
            }
        }

        Self::from_profiles(profiles)
    }

    /// Assemble a set from ready-made profiles. Names must be unique.
    pub fn from_profiles(mut profiles: Vec<IdentityProfile>) -> Result<Self, ProfileError> {
        if profiles.is_empty() {
            return Err(ProfileError::NoProfiles);
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = profiles.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(ProfileError::DuplicateIdentity(pair[0].name.clone()));
        }

        let dim = profiles[0].reference.dim();
        let mut flat = Vec::with_capacity(profiles.len() * dim);
        let mut norms = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            if profile.reference.dim() != dim {
                return Err(ProfileError::DimensionMismatch {
                    expected: dim,
                    actual: profile.reference.dim(),
                });
            }
            flat.extend_from_slice(&profile.reference.values);
            norms.push(profile.reference.norm());
        }

        let references = Array2::from_shape_vec((profiles.len(), dim), flat).map_err(|_| {
            ProfileError::DimensionMismatch {
                expected: profiles.len() * dim,
                actual: norms.len() * dim,
            }
        })?;

        Ok(Self {
            profiles,
            references,
            norms,
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Embedding dimensionality shared by every reference.
    pub fn dim(&self) -> usize {
        self.references.ncols()
    }

    pub fn get(&self, name: &str) -> Option<&IdentityProfile> {
        self.profiles
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.profiles[i])
    }

    /// Profiles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &IdentityProfile> {
        self.profiles.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    /// Cosine similarity of `probe` against every reference, in name order.
    pub fn scores(&self, probe: &Embedding) -> Result<Vec<f32>, ProfileError> {
        if probe.dim() != self.dim() {
            return Err(ProfileError::DimensionMismatch {
                expected: self.dim(),
                actual: probe.dim(),
            });
        }

        let unit = probe.normalized();
        let probe_norm = unit.norm();
        let dots = self.references.dot(&Array1::from(unit.values));

        Ok(dots
            .iter()
            .zip(&self.norms)
            .map(|(&dot, &ref_norm)| {
                let denom = probe_norm * ref_norm;
                if denom > 0.0 {
                    (dot / denom).clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Nearest identity for `probe`, if its similarity reaches `threshold`.
    ///
    /// Ties keep the first identity in name order.
    pub fn best_match(
        &self,
        probe: &Embedding,
        threshold: f32,
    ) -> Result<Option<(&IdentityProfile, f32)>, ProfileError> {
        let scores = self.scores(probe)?;

        let mut best_sim = f32::NEG_INFINITY;
        let mut best_idx: Option<usize> = None;
        for (i, &sim) in scores.iter().enumerate() {
            if sim > best_sim {
                best_sim = sim;
                best_idx = Some(i);
            }
        }

        Ok(match best_idx {
            Some(idx) if best_sim >= threshold => Some((&self.profiles[idx], best_sim)),
            _ => None,
        })
    }
}
