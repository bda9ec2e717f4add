//! Face classification against a [`ProfileSet`].

use crate::profile::{ProfileError, ProfileSet};
use crate::types::{DetectedFace, Match};

/// Strategy for classifying a detected face against the known identities.
pub trait Matcher {
    /// Return the face's identity if the best similarity reaches `threshold`.
    fn compare(
        &self,
        face: &DetectedFace,
        profiles: &ProfileSet,
        threshold: f32,
    ) -> Result<Option<Match>, ProfileError>;
}

/// Nearest-center cosine matcher.
///
/// Scores the probe against every reference at once and keeps the highest.
/// Exact ties go to the identity whose name sorts first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(
        &self,
        face: &DetectedFace,
        profiles: &ProfileSet,
        threshold: f32,
    ) -> Result<Option<Match>, ProfileError> {
        let best = profiles.best_match(&face.embedding, threshold)?;
        Ok(best.map(|(profile, score)| Match {
            bbox: face.bbox.clone(),
            identity: profile.name.clone(),
            score,
        }))
    }
}
