//! facefind — find known people in a collection of event photos.
//!
//! Builds reference profiles from a directory of known faces, scans a photo
//! directory, and writes annotated copies, per-person galleries and reports.

pub mod annotate;
pub mod config;
pub mod enroll;
pub mod export;
mod font;
pub mod photos;
pub mod pipeline;
pub mod report;
pub mod scanner;

pub use config::Config;
pub use export::{Exporter, ReportPaths};
pub use pipeline::{run, RunSummary};
pub use report::{MatchReport, PhotoRecord};
pub use scanner::{NoProgress, Progress, ScanError, Scanner};
