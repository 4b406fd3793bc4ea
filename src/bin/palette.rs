use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use image_palette::{Engine, ExtractorConfig, PaletteEntry, extract_palette_with};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif", "webp"];

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EngineArg {
    Lloyd,
    KmeansColors,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Lloyd => Engine::Lloyd,
            EngineArg::KmeansColors => Engine::KmeansColors,
        }
    }
}

/// Print the dominant colours of one or more images.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of palette colours
    #[arg(short = 'k', long)]
    num_colors: Option<usize>,

    /// Seed for centroid initialisation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Independent clustering restarts
    #[arg(short, long)]
    runs: Option<usize>,

    /// Clustering implementation
    #[arg(short, long, value_enum)]
    engine: Option<EngineArg>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn extractor_config(&self) -> Result<ExtractorConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExtractorConfig::default(),
        };
        if let Some(k) = self.num_colors {
            config = config.with_num_colors(k);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(runs) = self.runs {
            config = config.with_runs(runs);
        }
        if let Some(engine) = self.engine {
            config = config.with_engine(engine.into());
        }
        config.validate().context("invalid settings")?;
        Ok(config)
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn process(path: &Path, config: &ExtractorConfig) -> Result<Vec<PaletteEntry>> {
    if !path.is_file() || !is_supported_image(path) {
        bail!("not a supported image file");
    }
    let bytes = fs::read(path)?;
    let img = image::load_from_memory(&bytes).context("unable to decode image")?;
    let extraction = extract_palette_with(&img, config).context("palette extraction failed")?;
    info!(convergence = ?extraction.convergence, "extracted palette");
    Ok(extraction.entries)
}

fn print_table<W: Write>(out: &mut W, path: &Path, entries: &[PaletteEntry]) -> io::Result<()> {
    writeln!(out, "{}", path.display())?;
    for entry in entries {
        writeln!(out, "  {}  {:6.2}%", entry.color_code, entry.percentage)?;
    }
    Ok(())
}

/// Process every input in order and return how many failed.
///
/// A failed file is reported on `err` and skipped; tables already written to
/// `out` stay valid. In JSON mode only the successful files are emitted.
fn run_batch<W: Write, E: Write>(
    inputs: &[PathBuf],
    config: &ExtractorConfig,
    json: bool,
    out: &mut W,
    err: &mut E,
) -> Result<usize> {
    let mut failures = 0usize;
    let mut results = serde_json::Map::new();
    for input in inputs {
        match process(input, config) {
            Ok(entries) if json => {
                results.insert(input.display().to_string(), serde_json::json!(entries));
            }
            Ok(entries) => print_table(out, input, &entries)?,
            Err(e) => {
                failures += 1;
                writeln!(err, "{}: {e:#}", input.display())?;
            }
        }
    }

    if json {
        let text = serde_json::to_string_pretty(&results).context("cannot serialise results")?;
        writeln!(out, "{text}")?;
    }

    Ok(failures)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let config = match args.extractor_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    match run_batch(
        &args.inputs,
        &config,
        args.json,
        &mut stdout.lock(),
        &mut stderr.lock(),
    ) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
