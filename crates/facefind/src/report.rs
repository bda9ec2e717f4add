//! Per-photo records and the run-wide per-identity report.

use facefind_core::Match;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Header of `matches.csv`.
pub const CSV_HEADER: &str = "photo,annotated,matches,scores";

/// Summary of one photo that contained at least one recognised face.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub photo_path: PathBuf,
    pub annotated_path: PathBuf,
    /// Best score per matched identity; the keys are the matched identities.
    pub scores: BTreeMap<String, f32>,
}

impl PhotoRecord {
    /// Build a record from a photo's matches. Returns `None` for no matches.
    pub fn from_matches(
        photo_path: PathBuf,
        annotated_path: PathBuf,
        matches: &[Match],
    ) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }
        let mut scores: BTreeMap<String, f32> = BTreeMap::new();
        for m in matches {
            scores
                .entry(m.identity.clone())
                .and_modify(|best| *best = best.max(m.score))
                .or_insert(m.score);
        }
        Some(Self {
            photo_path,
            annotated_path,
            scores,
        })
    }

    /// Matched identity names, sorted.
    pub fn matched_identities(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    /// One `matches.csv` row, with `annotated` as the path to print.
    pub fn csv_row(&self, annotated: &Path) -> Result<String, serde_json::Error> {
        let names = self.matched_identities().collect::<Vec<_>>().join(",");
        let scores = serde_json::to_string(&self.scores)?;
        Ok([
            csv_field(&self.photo_path.display().to_string()),
            csv_field(&annotated.display().to_string()),
            csv_field(&names),
            csv_field(&scores),
        ]
        .join(","))
    }
}

/// Quote a CSV field if it contains a delimiter, quote, or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// One appearance of an identity in the scanned photos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appearance {
    pub photo: String,
    pub score: f32,
}

/// Run-wide per-identity listing of every qualifying match.
///
/// Seeded with every known identity so identities that were never seen still
/// appear (with no appearances) in the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchReport {
    matches: BTreeMap<String, Vec<Appearance>>,
}

impl MatchReport {
    pub fn new<'a>(identities: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            matches: identities
                .into_iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Append one appearance of `identity`.
    pub fn record(&mut self, identity: &str, photo: &Path, score: f32) {
        self.matches
            .entry(identity.to_string())
            .or_default()
            .push(Appearance {
                photo: photo.display().to_string(),
                score,
            });
    }

    pub fn appearances(&self, identity: &str) -> &[Appearance] {
        self.matches
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.matches.keys().map(String::as_str)
    }

    /// Total appearances across all identities.
    pub fn total(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    /// `{"matches": {identity: [{photo, score}, ...]}}`, pretty-printed.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
