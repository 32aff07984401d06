use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use sift_cli::{SiftPipeline, init_threads};
use image::DynamicImage;
use sift_scale::{Detection, DetectorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Lowe,
    Fast,
    Dense,
}

#[derive(Parser, Debug)]
#[command(about = "Detect SIFT scale-space extrema and draw them on the input image")]
struct Args {
    /// Input image
    input: PathBuf,

    /// Annotated output image (default: <input stem>_sift.png next to input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write candidates and keypoints as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Parameter preset
    #[arg(long, value_enum, default_value_t = Preset::Lowe)]
    preset: Preset,

    /// Load the detector configuration from a .toml or .json file instead of a preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Intervals sampled per octave
    #[arg(long)]
    intervals: Option<usize>,

    /// Base blur of each octave
    #[arg(long)]
    sigma: Option<f64>,

    #[arg(long)]
    contrast_threshold: Option<f64>,

    #[arg(long)]
    curvature_threshold: Option<f64>,

    /// Margin in pixels in which no extrema are reported
    #[arg(long)]
    border: Option<usize>,

    /// Fixed octave count
    #[arg(long)]
    octaves: Option<usize>,

    /// Skip the 2x upscale of the input
    #[arg(long)]
    no_double: bool,

    /// Report raw candidates only
    #[arg(long)]
    no_refine: bool,

    #[arg(long)]
    threads: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[cfg(feature = "serde")]
fn load_config(path: &Path) -> Result<DetectorConfig> {
    let loaded = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => DetectorConfig::load_toml(path),
        Some("json") => DetectorConfig::load_json(path),
        _ => bail!("unsupported config format: {}", path.display()),
    };
    loaded.map_err(|e| anyhow::anyhow!("loading {}: {}", path.display(), e))
}

#[cfg(not(feature = "serde"))]
fn load_config(path: &Path) -> Result<DetectorConfig> {
    bail!("reading {} requires the `serde` feature", path.display())
}

fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => match args.preset {
            Preset::Lowe => DetectorConfig::lowe_preset(),
            Preset::Fast => DetectorConfig::fast_preset(),
            Preset::Dense => DetectorConfig::dense_preset(),
        },
    };

    if let Some(v) = args.intervals {
        cfg.core.intervals = v;
    }
    if let Some(v) = args.sigma {
        cfg.core.sigma = v;
    }
    if let Some(v) = args.contrast_threshold {
        cfg.core.contrast_threshold = v;
    }
    if let Some(v) = args.curvature_threshold {
        cfg.core.curvature_threshold = v;
    }
    if let Some(v) = args.border {
        cfg.core.border = v;
    }
    if let Some(v) = args.threads {
        cfg.core.n_threads = v;
    }
    if args.octaves.is_some() {
        cfg.octaves = args.octaves;
    }
    if args.no_double {
        cfg.core.double_image = false;
    }
    if args.no_refine {
        cfg.refine = false;
    }

    cfg.validate().context("invalid detector configuration")?;
    Ok(cfg)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let dir = input.parent().unwrap_or(Path::new("."));
    dir.join(format!("{stem}_sift.png"))
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let cfg = build_config(&args)?;
    info!("{}", cfg.summary());
    init_threads(cfg.core.n_threads).context("building thread pool")?;

    let pipeline = SiftPipeline::new(cfg)?;
    let img = SiftPipeline::load_image(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let t0 = Instant::now();
    let detection = pipeline.detect(&img)?;
    let elapsed = t0.elapsed();

    info!(
        elapsed = ?elapsed,
        octaves = detection.octave_count(),
        candidates = detection.candidates.len(),
        keypoints = detection.keypoints.len(),
        "detection complete"
    );

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));
    pipeline
        .annotate(&img, &detection)
        .save(&output)
        .with_context(|| format!("saving {}", output.display()))?;
    info!(path = %output.display(), "saved annotated image");

    if let Some(path) = &args.json {
        write_report(path, &img, &detection)?;
    }

    Ok(())
}

#[cfg(feature = "serde")]
fn write_report(path: &Path, img: &DynamicImage, detection: &Detection) -> Result<()> {
    sift_cli::DetectionReport::new(img, detection)
        .save_json(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "saved detection report");
    Ok(())
}

#[cfg(not(feature = "serde"))]
fn write_report(path: &Path, _img: &DynamicImage, _detection: &Detection) -> Result<()> {
    bail!("writing {} requires the `serde` feature", path.display())
}
