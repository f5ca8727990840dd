//! CLI application for removing watermarks from PDF documents.

mod review;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use console::style;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use unmark_core::transform::{AlwaysKeep, AlwaysRemove, RemovalOptions, RemovalReviewer};
use unmark_core::{DocumentPipeline, Mode, UnmarkConfig};

use review::TerminalReviewer;

/// Remove image, text and form watermarks from PDF documents
#[derive(Parser)]
#[command(name = "unmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file
    #[arg(short, long, default_value = "out.pdf")]
    output: PathBuf,

    /// Treat pages as scanned images and rebuild them without colored marks
    #[arg(long)]
    scanned: bool,

    /// Review image XObjects for removal
    #[arg(short = 'i')]
    images: bool,

    /// Erase text runs starting with this string
    #[arg(long, value_name = "STRING")]
    text: Option<String>,

    /// Do not remove text forms when no text run matches
    #[arg(long)]
    skip_form: bool,

    /// How image removal is decided
    #[arg(long, value_enum, default_value = "prompt")]
    review: ReviewPolicy,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ReviewPolicy {
    /// Ask on the terminal for every image
    Prompt,
    /// Remove every image
    Remove,
    /// Keep every image
    Keep,
}

impl ReviewPolicy {
    fn reviewer(self) -> Box<dyn RemovalReviewer> {
        match self {
            ReviewPolicy::Prompt => Box::new(TerminalReviewer::new()),
            ReviewPolicy::Remove => Box::new(AlwaysRemove),
            ReviewPolicy::Keep => Box::new(AlwaysKeep),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    run(cli)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(cli.config.as_deref())?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let mode = if cli.scanned {
        Mode::Scanned
    } else {
        Mode::Normal
    };
    let options = RemovalOptions {
        remove_images: cli.images,
        watermark_text: cli.text,
        form_fallback: !cli.skip_form,
    };
    if cli.scanned && !options.is_noop() {
        info!("Scanned mode ignores -i and --text");
    }

    info!("Processing file: {}", cli.input.display());
    let mut reviewer = cli.review.reviewer();
    let summary = DocumentPipeline::new(config, mode, options).run(
        &cli.input,
        &cli.output,
        reviewer.as_mut(),
    )?;

    println!(
        "{} Output written to {}",
        style("✓").green(),
        cli.output.display()
    );
    match mode {
        Mode::Normal => println!(
            "{} {} page(s): {} image(s), {} text run(s), {} form(s) removed",
            style("ℹ").blue(),
            summary.pages,
            summary.images_removed,
            summary.text_runs_erased,
            summary.forms_removed
        ),
        Mode::Scanned => println!(
            "{} {} page(s): {} pixel(s) whitened",
            style("ℹ").blue(),
            summary.pages,
            summary.pixels_whitened
        ),
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("unmark")
        .join("config.json")
}

/// `-c` path, else the per-user config file if present, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<UnmarkConfig> {
    if let Some(path) = path {
        return Ok(UnmarkConfig::from_file(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        Ok(UnmarkConfig::from_file(&default_path)?)
    } else {
        Ok(UnmarkConfig::default())
    }
}
