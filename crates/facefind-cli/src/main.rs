use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facefind::config::FAST_DETECTOR_INPUT_SIZE;
use facefind::{Config, ScanError};
use facefind_core::{Accelerator, OnnxFaceEmbedder};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facefind", version, about = "Find known people in event photos")]
struct Cli {
    /// TOML configuration file (defaults < file < FACEFIND_* env < flags)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Directory with one sub-directory of reference photos per person
    #[arg(long, global = true)]
    known: Option<PathBuf>,
    /// Directory of event photos to scan (recursively)
    #[arg(long, global = true)]
    photos: Option<PathBuf>,
    /// Output directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true)]
    models: Option<PathBuf>,
    /// Match threshold; lower = more matches, higher = more accurate
    #[arg(short, long, global = true)]
    threshold: Option<f32>,
    /// Minimum face size in pixels
    #[arg(long, global = true)]
    min_face: Option<u32>,
    /// Detector input resolution (multiple of 32)
    #[arg(long, global = true, conflicts_with = "fast")]
    det_size: Option<u32>,
    /// Fast mode: lower detector resolution, good for clear photos
    #[arg(long, global = true)]
    fast: bool,
    /// Inference backend: cpu or gpu
    #[arg(long, global = true)]
    accelerator: Option<Accelerator>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build profiles, scan photos, and write galleries and reports
    Scan,
    /// Build reference profiles and list the usable identities
    Profiles,
    /// Print the effective configuration
    Config,
}

impl Overrides {
    fn apply(self, mut cfg: Config) -> Config {
        if let Some(v) = self.known {
            cfg.known_dir = v;
        }
        if let Some(v) = self.photos {
            cfg.photos_dir = v;
        }
        if let Some(v) = self.output {
            cfg.output_dir = v;
        }
        if let Some(v) = self.models {
            cfg.model_dir = v;
        }
        if let Some(v) = self.threshold {
            cfg.similarity_threshold = v;
        }
        if let Some(v) = self.min_face {
            cfg.min_face_size = v;
        }
        if self.fast {
            cfg.detector_input_size = FAST_DETECTOR_INPUT_SIZE;
        }
        if let Some(v) = self.det_size {
            cfg.detector_input_size = v;
        }
        if let Some(v) = self.accelerator {
            cfg.accelerator = v;
        }
        cfg
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cfg = Config::load(cli.config.as_deref())?.with_env();
    let cfg = cli.overrides.apply(cfg);
    cfg.validate()?;

    match cli.command {
        Commands::Scan => scan(&cfg),
        Commands::Profiles => profiles(&cfg),
        Commands::Config => {
            print!("{}", cfg.to_toml()?);
            Ok(())
        }
    }
}

fn load_embedder(cfg: &Config) -> Result<OnnxFaceEmbedder> {
    tracing::info!(
        model_dir = %cfg.model_dir.display(),
        det_size = cfg.detector_input_size,
        accelerator = %cfg.accelerator,
        "loading face models"
    );
    OnnxFaceEmbedder::load(&cfg.model_dir, cfg.detector_input_size, cfg.accelerator)
        .context("failed to load face models")
}

fn scan(cfg: &Config) -> Result<()> {
    let mut embedder = load_embedder(cfg)?;

    let mut progress = |current: usize, total: usize, name: &str| {
        tracing::info!(current, total, file = name, "scanning");
    };

    let summary = match facefind::run(cfg, &mut embedder, &mut progress) {
        Ok(summary) => summary,
        Err(ScanError::NoProfiles) => {
            anyhow::bail!(
                "no valid reference faces found under {}",
                cfg.known_dir.display()
            )
        }
        Err(e) => return Err(e).context("scan failed"),
    };

    println!("Loaded: {}", summary.identities.join(", "));
    println!(
        "Scanned {} photos: {} matched, {} skipped",
        summary.photos, summary.matched, summary.skipped
    );
    println!(
        "People identified: {} of {}",
        summary.identified(),
        summary.identities.len()
    );
    for (name, count) in &summary.appearances {
        println!("  {name}: {count} appearance(s)");
    }
    println!("CSV: {}", summary.reports.csv.display());
    println!("JSON: {}", summary.reports.json.display());
    Ok(())
}

fn profiles(cfg: &Config) -> Result<()> {
    let mut embedder = load_embedder(cfg)?;
    let profiles =
        facefind::enroll::build_profiles(&mut embedder, &cfg.known_dir, cfg.min_face_size)
            .with_context(|| format!("building profiles from {}", cfg.known_dir.display()))?;

    for profile in profiles.iter() {
        println!("{}\t{} sample(s)", profile.name, profile.samples);
    }
    Ok(())
}
