//! Compositing CLI tool
//!
//! Command-line interface that pairs original photos with their
//! background-removed versions and writes finished product images.

use super::config::CliConfigBuilder;
use crate::{
    batch::{composite_batch_with_progress, default_concurrency, BatchSummary, CompositeJob},
    config::{CompositeRequest, OutputFormat, ResizeFilter},
    services::{ImageIOService, OutputFormatHandler},
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    Compositor,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use instant::Instant;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn, Instrument};
use walkdir::WalkDir;

/// Tag-preserving background compositor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgcomposite")]
pub struct Cli {
    /// Original image, or a directory of originals for batch mode
    #[arg(long, value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Background-removed image, or a directory of them (paired by file stem)
    #[arg(long, value_name = "REMOVED")]
    pub removed: PathBuf,

    /// Output file (single pair) or directory (batch mode)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Canvas background
    #[arg(short, long, value_enum)]
    pub background: Option<CliBackground>,

    /// Hex color used with `--background custom`
    #[arg(long, default_value = "#F2F2F2")]
    pub color: String,

    /// Canvas size as WIDTHxHEIGHT [default: 1000x1000]
    #[arg(long, value_name = "WxH")]
    pub canvas: Option<String>,

    /// Crop to the non-transparent content before placing it on the canvas
    #[arg(long)]
    pub auto_crop: bool,

    /// Near-white threshold; original pixels brighter than this on every channel are background [default: 240]
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Minimum original alpha for a pixel to be restorable [default: 255]
    #[arg(long)]
    pub min_alpha: Option<u8>,

    /// Only restore pixels matching these tag colors (red, dark)
    #[arg(long, value_delimiter = ',')]
    pub tag_colors: Vec<String>,

    /// Resampling filter for shrink-to-fit
    #[arg(long, value_enum)]
    pub filter: Option<CliResizeFilter>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// JPEG quality (0-100); lossless formats ignore it
    #[arg(long, default_value_t = 90)]
    pub quality: u8,

    /// Number of parallel workers in batch mode (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Walk directories recursively in batch mode
    #[arg(short, long)]
    pub recursive: bool,

    /// JSON file with a saved compositing request; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log output format (json needs the tracing-json feature)
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackground {
    Transparent,
    White,
    Custom,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => Self::Png,
            CliOutputFormat::Jpeg => Self::Jpeg,
            CliOutputFormat::Webp => Self::WebP,
            CliOutputFormat::Tiff => Self::Tiff,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    Json,
}

impl TryFrom<CliLogFormat> for TracingFormat {
    type Error = anyhow::Error;

    fn try_from(format: CliLogFormat) -> Result<Self> {
        match format {
            CliLogFormat::Console => Ok(Self::Console),
            CliLogFormat::Compact => Ok(Self::Compact),
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Ok(Self::Json),
            #[cfg(not(feature = "tracing-json"))]
            CliLogFormat::Json => anyhow::bail!("JSON logs need a build with the tracing-json feature"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResizeFilter {
    Nearest,
    Triangle,
    Catmullrom,
    Gaussian,
    Lanczos3,
}

impl From<CliResizeFilter> for ResizeFilter {
    fn from(filter: CliResizeFilter) -> Self {
        match filter {
            CliResizeFilter::Nearest => Self::Nearest,
            CliResizeFilter::Triangle => Self::Triangle,
            CliResizeFilter::Catmullrom => Self::CatmullRom,
            CliResizeFilter::Gaussian => Self::Gaussian,
            CliResizeFilter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// An original file and its background-removed counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImagePair {
    pub(crate) stem: String,
    pub(crate) original: PathBuf,
    pub(crate) removed: PathBuf,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format = TracingFormat::try_from(cli.log_format)?;
    init_cli_tracing(cli.verbose, log_format).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let request = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let format = OutputFormat::from(cli.format);
    OutputFormatHandler::validate_for_background(format, request.background);

    info!(
        canvas = %request.canvas_size,
        background = %request.background,
        auto_crop = request.auto_crop,
        "Starting compositor"
    );

    if cli.original.is_dir() {
        run_batch(&cli, request, format).await
    } else {
        run_single(&cli, &request, format)
    }
}

fn run_single(cli: &Cli, request: &CompositeRequest, format: OutputFormat) -> Result<()> {
    let stem = file_stem(&cli.original);
    let _span = spans::pair_processing(&stem, &cli.original).entered();
    let start = Instant::now();

    let original = ImageIOService::load_image(&cli.original)
        .with_context(|| format!("Failed to load original {}", cli.original.display()))?;
    let removed = ImageIOService::load_image(&cli.removed)
        .with_context(|| format!("Failed to load background-removed image {}", cli.removed.display()))?;

    let compositor = Compositor::new(request.clone())?;
    let result = compositor
        .run(&original, &removed)
        .with_context(|| format!("Failed to composite {}", stem))?;
    debug!("{}", result.timing_summary());

    let output = match &cli.output {
        Some(path) => path.clone(),
        None => {
            let dir = cli.original.parent().unwrap_or_else(|| Path::new("."));
            dir.join(output_file_name(&stem, format))
        },
    };

    ImageIOService::save_image(&result.image, &output, format, cli.quality)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    info!(
        restored_pixels = result.metadata.restored_pixels,
        "Processed: {} -> {} in {:.2}s",
        cli.original.display(),
        output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn run_batch(cli: &Cli, request: CompositeRequest, format: OutputFormat) -> Result<()> {
    let pairs = discover_pairs(&cli.original, &cli.removed, cli.recursive)?;
    if pairs.is_empty() {
        anyhow::bail!(
            "No matching image pairs found in {} and {}",
            cli.original.display(),
            cli.removed.display()
        );
    }

    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("composited"));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let start = Instant::now();
    let summary = process_batch(cli, &pairs, request, format, &output_dir)
        .instrument(spans::batch_processing(pairs.len()))
        .await?;

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Batch finished in {:.2}s, output in {}",
        start.elapsed().as_secs_f64(),
        output_dir.display()
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} pairs failed", summary.failed, summary.total);
    }
    Ok(())
}

async fn process_batch(
    cli: &Cli,
    pairs: &[ImagePair],
    request: CompositeRequest,
    format: OutputFormat,
    output_dir: &Path,
) -> Result<BatchSummary> {
    let workers = if cli.jobs == 0 { default_concurrency() } else { cli.jobs };

    let progress = ProgressBar::new(pairs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut summary = BatchSummary::default();

    // Load a bounded chunk at a time so large batches don't sit in memory at once
    for chunk in pairs.chunks(workers.saturating_mul(4).max(1)) {
        let mut jobs = Vec::with_capacity(chunk.len());
        for pair in chunk {
            match load_pair(pair) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    error!(stem = %pair.stem, error = %format!("{:#}", e), "Skipping pair");
                    summary.total += 1;
                    summary.failed += 1;
                    progress.inc(1);
                },
            }
        }

        let outcomes = composite_batch_with_progress(jobs, request.clone(), workers, |outcome| {
            progress.set_message(outcome.id.clone());
            progress.inc(1);
        })
        .await?;

        for outcome in outcomes {
            summary.total += 1;
            let saved = outcome.result.map_err(anyhow::Error::from).and_then(|result| {
                let path = output_dir.join(output_file_name(&outcome.id, format));
                ImageIOService::save_image(&result.image, &path, format, cli.quality)
                    .with_context(|| format!("Failed to save {}", path.display()))
            });
            match saved {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(stem = %outcome.id, error = %format!("{:#}", e), "Pair failed");
                },
            }
        }
    }

    progress.finish_with_message("done");
    Ok(summary)
}

fn load_pair(pair: &ImagePair) -> Result<CompositeJob> {
    let original = ImageIOService::load_image(&pair.original)
        .with_context(|| format!("Failed to load original {}", pair.original.display()))?;
    let removed = ImageIOService::load_image(&pair.removed)
        .with_context(|| format!("Failed to load background-removed image {}", pair.removed.display()))?;
    Ok(CompositeJob::new(pair.stem.clone(), original, removed))
}

/// `<stem>_composited.<ext>`
pub(crate) fn output_file_name(stem: &str, format: OutputFormat) -> String {
    format!("{}_composited.{}", stem, OutputFormatHandler::get_extension(format))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned())
}

/// Supported image files under `dir`, keyed by stem, in sorted order
fn collect_images(dir: &Path, recursive: bool) -> BTreeMap<String, PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = BTreeMap::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            },
        };
        if !entry.file_type().is_file() || !ImageIOService::is_supported_format(entry.path()) {
            continue;
        }
        let stem = file_stem(entry.path());
        if let Some(previous) = images.insert(stem.clone(), entry.path().to_path_buf()) {
            warn!(stem = %stem, previous = %previous.display(), "Duplicate stem; keeping the later file");
        }
    }

    images
}

/// Pair originals with background-removed files by file stem
///
/// Originals without a counterpart are skipped with a warning.
pub(crate) fn discover_pairs(original_dir: &Path, removed_dir: &Path, recursive: bool) -> Result<Vec<ImagePair>> {
    if !removed_dir.is_dir() {
        anyhow::bail!(
            "In batch mode --removed must be a directory, got {}",
            removed_dir.display()
        );
    }

    let originals = collect_images(original_dir, recursive);
    let mut removed = collect_images(removed_dir, recursive);

    let mut pairs = Vec::with_capacity(originals.len());
    for (stem, original) in originals {
        match removed.remove(&stem) {
            Some(removed_path) => pairs.push(ImagePair {
                stem,
                original,
                removed: removed_path,
            }),
            None => warn!(stem = %stem, "No background-removed counterpart; skipping"),
        }
    }

    for stem in removed.keys() {
        debug!(stem = %stem, "Background-removed file has no original");
    }

    Ok(pairs)
}
