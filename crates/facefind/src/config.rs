use facefind_core::detector::SCRFD_DEFAULT_INPUT_SIZE;
use facefind_core::Accelerator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Detector input size used by "fast mode" (roughly 2–3× quicker, misses small faces).
pub const FAST_DETECTOR_INPUT_SIZE: u32 = 320;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("serializing config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("similarity threshold {0} is outside [-1, 1]")]
    Threshold(f32),
    #[error("detector input size {0} must be a positive multiple of 32")]
    DetectorInputSize(u32),
}

/// Run configuration.
///
/// Layered as defaults < TOML file < `FACEFIND_*` environment < CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory with one sub-directory of reference photos per person.
    pub known_dir: PathBuf,
    /// Directory scanned recursively for candidate photos.
    pub photos_dir: PathBuf,
    /// Root of the `annotated/`, `per_person/` and `reports/` outputs.
    pub output_dir: PathBuf,
    /// Directory containing the SCRFD and ArcFace ONNX models.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match (inclusive).
    pub similarity_threshold: f32,
    /// Faces narrower or shorter than this many pixels are ignored.
    pub min_face_size: u32,
    /// Square input resolution of the face detector.
    pub detector_input_size: u32,
    pub accelerator: Accelerator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            known_dir: PathBuf::from("Known"),
            photos_dir: PathBuf::from("Event Photos"),
            output_dir: PathBuf::from("output"),
            model_dir: facefind_core::default_model_dir(),
            similarity_threshold: 0.35,
            min_face_size: 60,
            detector_input_size: SCRFD_DEFAULT_INPUT_SIZE,
            accelerator: Accelerator::Cpu,
        }
    }
}

impl Config {
    /// Defaults overlaid with the TOML file at `path`.
    ///
    /// A given path that cannot be read is an error, missing files included.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults overlaid with `FACEFIND_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay `FACEFIND_*` environment variables onto this configuration.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`. Unparseable values are ignored with a warning.
    pub fn with_vars(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, current: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(current);

        Self {
            known_dir: path("FACEFIND_KNOWN_DIR", self.known_dir),
            photos_dir: path("FACEFIND_PHOTOS_DIR", self.photos_dir),
            output_dir: path("FACEFIND_OUTPUT_DIR", self.output_dir),
            model_dir: path("FACEFIND_MODEL_DIR", self.model_dir),
            similarity_threshold: env_parse(
                &lookup,
                "FACEFIND_SIMILARITY_THRESHOLD",
                self.similarity_threshold,
            ),
            min_face_size: env_parse(&lookup, "FACEFIND_MIN_FACE_SIZE", self.min_face_size),
            detector_input_size: env_parse(
                &lookup,
                "FACEFIND_DETECTOR_INPUT_SIZE",
                self.detector_input_size,
            ),
            accelerator: env_parse(&lookup, "FACEFIND_ACCELERATOR", self.accelerator),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Threshold(self.similarity_threshold));
        }
        if self.detector_input_size == 0 || self.detector_input_size % 32 != 0 {
            return Err(ConfigError::DetectorInputSize(self.detector_input_size));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
                default
            }
        },
        None => default,
    }
}
