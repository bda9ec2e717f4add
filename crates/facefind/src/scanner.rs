use crate::annotate;
use crate::export::{ExportError, Exporter};
use crate::photos::{self, PhotoError};
use crate::report::{MatchReport, PhotoRecord};
use facefind_core::{CosineMatcher, FaceEmbedder, Match, Matcher, ProfileError, ProfileSet};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no reference profiles available")]
    NoProfiles,
    #[error("building reference profiles: {0}")]
    Profiles(ProfileError),
    #[error("reading photos at {path}: {source}")]
    Photos {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

impl From<ProfileError> for ScanError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::NoProfiles => ScanError::NoProfiles,
            other => ScanError::Profiles(other),
        }
    }
}

/// Notified once per file, before the file is processed.
pub trait Progress {
    /// `current` is 1-based.
    fn on_file(&mut self, current: usize, total: usize, name: &str);
}

impl<F: FnMut(usize, usize, &str)> Progress for F {
    fn on_file(&mut self, current: usize, total: usize, name: &str) {
        self(current, total, name)
    }
}

/// Progress sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_file(&mut self, _: usize, _: usize, _: &str) {}
}

/// What one photo produced.
#[derive(Debug)]
pub enum PhotoOutcome {
    /// No face reached the threshold; the photo leaves no trace.
    NoMatches,
    Matched { image: RgbImage, matches: Vec<Match> },
}

/// Records and report accumulated over a scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// One per matched photo, in scan order.
    pub records: Vec<PhotoRecord>,
    pub report: MatchReport,
    /// Files that could not be decoded or embedded.
    pub skipped: usize,
}

/// Classifies the faces of each candidate photo against the known identities.
pub struct Scanner<'a, M: Matcher = CosineMatcher> {
    profiles: &'a ProfileSet,
    exporter: &'a Exporter,
    matcher: M,
    threshold: f32,
    min_face_size: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(
        profiles: &'a ProfileSet,
        exporter: &'a Exporter,
        threshold: f32,
        min_face_size: u32,
    ) -> Self {
        Self::with_matcher(profiles, exporter, CosineMatcher, threshold, min_face_size)
    }
}

impl<'a, M: Matcher> Scanner<'a, M> {
    pub fn with_matcher(
        profiles: &'a ProfileSet,
        exporter: &'a Exporter,
        matcher: M,
        threshold: f32,
        min_face_size: u32,
    ) -> Self {
        Self {
            profiles,
            exporter,
            matcher,
            threshold,
            min_face_size,
        }
    }

    /// Decode, detect and match one photo.
    pub fn process_photo<E: FaceEmbedder + ?Sized>(
        &self,
        embedder: &mut E,
        path: &Path,
    ) -> Result<PhotoOutcome, PhotoError> {
        let image = photos::decode(path)?;
        let faces = embedder
            .faces(&image)
            .map_err(|source| PhotoError::Extraction {
                path: path.display().to_string(),
                source,
            })?;

        let mut matches = Vec::new();
        for face in faces
            .iter()
            .filter(|f| f.bbox.meets_min_size(self.min_face_size))
        {
            let found = self
                .matcher
                .compare(face, self.profiles, self.threshold)
                .map_err(|source| PhotoError::Matching {
                    path: path.display().to_string(),
                    source,
                })?;
            matches.extend(found);
        }

        tracing::debug!(
            path = %path.display(),
            faces = faces.len(),
            matches = matches.len(),
            "photo processed"
        );

        if matches.is_empty() {
            Ok(PhotoOutcome::NoMatches)
        } else {
            Ok(PhotoOutcome::Matched { image, matches })
        }
    }

    /// Scan `files` in order, exporting every photo with a match.
    ///
    /// Unreadable photos are skipped; export failures abort the scan.
    pub fn scan<E, P>(
        &self,
        files: &[PathBuf],
        embedder: &mut E,
        progress: &mut P,
    ) -> Result<ScanOutcome, ScanError>
    where
        E: FaceEmbedder + ?Sized,
        P: Progress + ?Sized,
    {
        let total = files.len();
        let mut outcome = ScanOutcome {
            report: MatchReport::new(self.profiles.names()),
            ..ScanOutcome::default()
        };

        for (i, path) in files.iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.on_file(i + 1, total, &name);

            let (image, matches) = match self.process_photo(embedder, path) {
                Ok(PhotoOutcome::Matched { image, matches }) => (image, matches),
                Ok(PhotoOutcome::NoMatches) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping photo");
                    outcome.skipped += 1;
                    continue;
                }
            };

            let annotated_path = self.exporter.annotated_path(path)?;
            let Some(record) =
                PhotoRecord::from_matches(path.clone(), annotated_path, &matches)
            else {
                continue;
            };

            for m in &matches {
                outcome.report.record(&m.identity, path, m.score);
            }

            let rendered = annotate::annotate(&image, &matches);
            self.exporter.export_photo(&record, &rendered)?;

            tracing::info!(
                photo = %path.display(),
                identities = ?record.scores,
                "matched"
            );
            outcome.records.push(record);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facefind_core::{BoundingBox, DetectedFace, EmbedderError, Embedding};
    use std::collections::BTreeMap;

    /// Returns the same faces for every image.
    struct Fixed(Vec<DetectedFace>);

    impl FaceEmbedder for Fixed {
        fn faces(&mut self, _: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl FaceEmbedder for Failing {
        fn faces(&mut self, _: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
            Err(EmbedderError::Other("model exploded".into()))
        }
    }

    fn profiles() -> ProfileSet {
        let mut samples = BTreeMap::new();
        samples.insert("A".to_string(), vec![Embedding::new(vec![1.0, 0.0])]);
        samples.insert("B".to_string(), vec![Embedding::new(vec![0.0, 1.0])]);
        ProfileSet::from_samples(samples).unwrap()
    }

    fn face(size: f32, values: &[f32]) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::from_corners(0.0, 0.0, size, size),
            embedding: Embedding::new(values.to_vec()),
        }
    }

    fn write_photo(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(100, 100, image::Rgb([50, 50, 50]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_process_photo_filters_small_faces() {
        let dir = tempfile::tempdir().unwrap();
        let photo = write_photo(dir.path(), "p.png");
        let profiles = profiles();
        let exporter = Exporter::new(dir.path().join("out"));
        let scanner = Scanner::new(&profiles, &exporter, 0.35, 60);

        let mut small = Fixed(vec![face(59.0, &[1.0, 0.0])]);
        assert!(matches!(
            scanner.process_photo(&mut small, &photo).unwrap(),
            PhotoOutcome::NoMatches
        ));

        let mut mixed = Fixed(vec![face(59.0, &[1.0, 0.0]), face(80.0, &[0.1, 0.9])]);
        match scanner.process_photo(&mut mixed, &photo).unwrap() {
            PhotoOutcome::Matched { matches, .. } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].identity, "B");
            }
            PhotoOutcome::NoMatches => panic!("expected a match"),
        }
    }

    #[test]
    fn test_process_photo_error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = profiles();
        let exporter = Exporter::new(dir.path().join("out"));
        let scanner = Scanner::new(&profiles, &exporter, 0.35, 60);

        let garbage = dir.path().join("bad.jpg");
        std::fs::write(&garbage, b"nope").unwrap();
        assert!(matches!(
            scanner.process_photo(&mut Fixed(vec![]), &garbage),
            Err(PhotoError::Decode { .. })
        ));

        let photo = write_photo(dir.path(), "ok.png");
        assert!(matches!(
            scanner.process_photo(&mut Failing, &photo),
            Err(PhotoError::Extraction { .. })
        ));

        let mut wrong_dim = Fixed(vec![face(80.0, &[1.0, 0.0, 0.0])]);
        assert!(matches!(
            scanner.process_photo(&mut wrong_dim, &photo),
            Err(PhotoError::Matching { .. })
        ));
    }

    #[test]
    fn test_scan_progress_before_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_photo(dir.path(), "one.png"),
            dir.path().join("missing.png"),
            write_photo(dir.path(), "three.png"),
        ];
        let profiles = profiles();
        let exporter = Exporter::new(dir.path().join("out"));
        exporter.prepare().unwrap();
        let scanner = Scanner::new(&profiles, &exporter, 0.35, 60);

        let mut seen = Vec::new();
        let mut progress = |current: usize, total: usize, name: &str| {
            seen.push((current, total, name.to_string()));
        };
        let outcome = scanner
            .scan(&files, &mut Fixed(vec![face(80.0, &[1.0, 0.0])]), &mut progress)
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (1, 3, "one.png".to_string()),
                (2, 3, "missing.png".to_string()),
                (3, 3, "three.png".to_string()),
            ]
        );
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.report.appearances("A").len(), 2);
        assert!(outcome.report.appearances("B").is_empty());
    }

    #[test]
    fn test_scan_records_every_match_but_best_score() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_photo(dir.path(), "group.png")];
        let profiles = profiles();
        let exporter = Exporter::new(dir.path().join("out"));
        exporter.prepare().unwrap();
        let scanner = Scanner::new(&profiles, &exporter, 0.35, 60);

        let mut twins = Fixed(vec![face(80.0, &[1.0, 0.0]), face(90.0, &[0.8, 0.6])]);
        let outcome = scanner.scan(&files, &mut twins, &mut NoProgress).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert!((outcome.records[0].scores["A"] - 1.0).abs() < 1e-6);
        assert_eq!(outcome.report.appearances("A").len(), 2);
    }

    #[test]
    fn test_scan_error_from_profile_error() {
        assert!(matches!(
            ScanError::from(ProfileError::NoProfiles),
            ScanError::NoProfiles
        ));
        assert!(matches!(
            ScanError::from(ProfileError::DimensionMismatch { expected: 1, actual: 2 }),
            ScanError::Profiles(_)
        ));
    }
}
