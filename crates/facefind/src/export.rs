//! Output layout: annotated photos, per-person galleries, and reports.
//!
//! ```text
//! <root>/annotated/<stem>_annotated<ext>
//! <root>/per_person/<identity>/<original_filename>
//! <root>/reports/matches.csv
//! <root>/reports/matches.json
//! ```

use crate::photos;
use crate::report::{MatchReport, PhotoRecord, CSV_HEADER};
use image::RgbImage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("creating output directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("writing annotated image {path}: {source}")]
    Annotated {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("writing report {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("serializing report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("photo path has no file name: {0}")]
    NoFileName(String),
}

/// Where the reports of a run were written.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Writes everything a run produces under one output root.
#[derive(Debug, Clone)]
pub struct Exporter {
    root: PathBuf,
}

impl Exporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn annotated_dir(&self) -> PathBuf {
        self.root.join("annotated")
    }

    pub fn per_person_dir(&self) -> PathBuf {
        self.root.join("per_person")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// Where the annotated rendering of `photo` goes.
    pub fn annotated_path(&self, photo: &Path) -> Result<PathBuf, ExportError> {
        let name = photos::annotated_file_name(photo)
            .ok_or_else(|| ExportError::NoFileName(photo.display().to_string()))?;
        Ok(self.annotated_dir().join(name))
    }

    /// Create the output directories.
    pub fn prepare(&self) -> Result<(), ExportError> {
        for dir in [self.annotated_dir(), self.per_person_dir(), self.reports_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| ExportError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Save the annotated image and copy the original into each matched
    /// identity's gallery. Returns the number of gallery copies made.
    ///
    /// A failed gallery copy is logged and skipped; a failed annotated write
    /// is an error.
    pub fn export_photo(
        &self,
        record: &PhotoRecord,
        annotated: &RgbImage,
    ) -> Result<usize, ExportError> {
        annotated
            .save(&record.annotated_path)
            .map_err(|source| ExportError::Annotated {
                path: record.annotated_path.display().to_string(),
                source,
            })?;

        let file_name = record
            .photo_path
            .file_name()
            .ok_or_else(|| ExportError::NoFileName(record.photo_path.display().to_string()))?;

        let mut copied = 0;
        for identity in record.matched_identities() {
            let gallery = self.per_person_dir().join(identity);
            let dest = gallery.join(file_name);
            let result = std::fs::create_dir_all(&gallery)
                .and_then(|_| std::fs::copy(&record.photo_path, &dest));
            match result {
                Ok(_) => copied += 1,
                Err(e) => tracing::warn!(
                    identity,
                    photo = %record.photo_path.display(),
                    dest = %dest.display(),
                    error = %e,
                    "gallery copy failed"
                ),
            }
        }
        Ok(copied)
    }

    /// Write `matches.csv` and `matches.json`.
    pub fn write_reports(
        &self,
        records: &[PhotoRecord],
        report: &MatchReport,
    ) -> Result<ReportPaths, ExportError> {
        let reports_dir = self.reports_dir();
        std::fs::create_dir_all(&reports_dir).map_err(|source| ExportError::CreateDir {
            path: reports_dir.display().to_string(),
            source,
        })?;

        let mut csv = String::from(CSV_HEADER);
        csv.push('\n');
        for record in records {
            let annotated = std::fs::canonicalize(&record.annotated_path)
                .unwrap_or_else(|_| record.annotated_path.clone());
            csv.push_str(&record.csv_row(&annotated)?);
            csv.push('\n');
        }

        let paths = ReportPaths {
            csv: reports_dir.join("matches.csv"),
            json: reports_dir.join("matches.json"),
        };
        write_file(&paths.csv, csv.as_bytes())?;
        write_file(&paths.json, report.to_json()?.as_bytes())?;

        tracing::info!(
            rows = records.len(),
            appearances = report.total(),
            csv = %paths.csv.display(),
            json = %paths.json.display(),
            "reports written"
        );
        Ok(paths)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Report {
        path: path.display().to_string(),
        source,
    })
}
