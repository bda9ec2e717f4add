//! End-to-end run: profiles → scan → exports → reports.

use crate::config::Config;
use crate::enroll;
use crate::export::{Exporter, ReportPaths};
use crate::photos;
use crate::scanner::{Progress, ScanError, Scanner};
use facefind_core::FaceEmbedder;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identities with a usable reference profile.
    pub identities: Vec<String>,
    /// Candidate photos enumerated.
    pub photos: usize,
    /// Photos with at least one match.
    pub matched: usize,
    /// Photos skipped because they could not be decoded or embedded.
    pub skipped: usize,
    /// Appearances per identity, in name order. Identities never seen count 0.
    pub appearances: Vec<(String, usize)>,
    pub reports: ReportPaths,
}

impl RunSummary {
    /// Number of identities found in at least one photo.
    pub fn identified(&self) -> usize {
        self.appearances.iter().filter(|(_, n)| *n > 0).count()
    }
}

/// Run the whole matching job described by `config`.
///
/// Aborts with [`ScanError::NoProfiles`] before touching any photo if no
/// identity has a usable reference face. Reports are written once, at the end.
pub fn run<E, P>(config: &Config, embedder: &mut E, progress: &mut P) -> Result<RunSummary, ScanError>
where
    E: FaceEmbedder + ?Sized,
    P: Progress + ?Sized,
{
    tracing::info!(known_dir = %config.known_dir.display(), "building reference profiles");
    let profiles = enroll::build_profiles(embedder, &config.known_dir, config.min_face_size)?;
    let identities: Vec<String> = profiles.names().map(str::to_string).collect();
    tracing::info!(count = identities.len(), identities = ?identities, "reference profiles ready");

    let files = photos::collect_images(&config.photos_dir).map_err(|source| ScanError::Photos {
        path: config.photos_dir.display().to_string(),
        source,
    })?;
    if files.is_empty() {
        tracing::warn!(photos_dir = %config.photos_dir.display(), "no photos found");
    }

    let exporter = Exporter::new(&config.output_dir);
    exporter.prepare()?;

    let scanner = Scanner::new(
        &profiles,
        &exporter,
        config.similarity_threshold,
        config.min_face_size,
    );
    let outcome = scanner.scan(&files, embedder, progress)?;
    let reports = exporter.write_reports(&outcome.records, &outcome.report)?;
    let appearances: Vec<(String, usize)> = outcome
        .report
        .identities()
        .map(|name| (name.to_string(), outcome.report.appearances(name).len()))
        .collect();

    tracing::info!(
        photos = files.len(),
        matched = outcome.records.len(),
        skipped = outcome.skipped,
        "scan complete"
    );

    Ok(RunSummary {
        identities,
        photos: files.len(),
        matched: outcome.records.len(),
        skipped: outcome.skipped,
        appearances,
        reports,
    })
}
