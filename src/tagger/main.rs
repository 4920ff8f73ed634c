//! Admin tagger CLI.
//!
//! Reads admin boundaries from one OSM XML file and writes a copy of a second
//! OSM XML file where every named node carries `is_in:*` tags.

mod config;

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use admin_tagger::enrich::OutputFile;
use admin_tagger::osm::{ingest, open_input};
use admin_tagger::pip::{assemble_boundaries, BoundaryIndex, PipService};
use admin_tagger::TaggerError;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "admin-tagger")]
#[command(about = "Tag OSM nodes with the country, region and municipality they lie in")]
struct Args {
    /// OSM XML file with admin boundary relations and ways (may be .gz)
    boundaries: PathBuf,

    /// OSM XML file whose named nodes get tagged (may be .gz)
    target: PathBuf,

    /// Where to write the tagged copy of the target file
    output: PathBuf,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only tag nodes that are stops, stations or places
    #[arg(long)]
    stops_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// How a run ended when it did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    /// Usage and the error were written to the diagnostic stream
    Usage,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Usage => ExitCode::FAILURE,
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    let outcome = run(&args, &config, &mut io::stderr())?;
    Ok(outcome.into())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if args.stops_only {
        config.stops_only = true;
    }
    Ok(config)
}

/// Run both phases. Usage errors and the match statistics go to `diag`.
fn run<D: Write>(args: &Args, config: &Config, diag: &mut D) -> Result<Outcome> {
    let boundary_progress = progress_bar()?;
    let target_progress = progress_bar()?;

    let Some(boundary_input) = open_or_usage(&args.boundaries, &boundary_progress, diag)? else {
        return Ok(Outcome::Usage);
    };
    let Some(target_input) = open_or_usage(&args.target, &target_progress, diag)? else {
        return Ok(Outcome::Usage);
    };
    let output = match OutputFile::create(&args.output) {
        Ok(output) => output,
        Err(e) => {
            usage(diag, format_args!("cannot write {}: {}", args.output.display(), e))?;
            return Ok(Outcome::Usage);
        }
    };

    info!("Admin tagger");
    info!("Boundaries: {}", args.boundaries.display());
    info!("Target: {}", args.target.display());

    let start = Instant::now();

    let tables = ingest(boundary_input).with_context(|| {
        format!("Failed to read boundaries from {}", args.boundaries.display())
    })?;
    boundary_progress.finish_and_clear();
    info!(
        "Loaded {} nodes, {} ways, {} relations",
        tables.nodes.len(),
        tables.ways.len(),
        tables.relations.len()
    );

    let boundaries = assemble_boundaries(&tables);
    drop(tables);

    let index = BoundaryIndex::build(boundaries, config.levels);
    info!("Indexed {} admin boundaries", index.len());
    let mut service = PipService::new(index);

    let summary = match output.write(target_input, &mut service, &config.enrich_options()) {
        Ok(summary) => summary,
        Err(TaggerError::Io(e)) => {
            target_progress.abandon();
            usage(diag, format_args!("cannot write {}: {}", args.output.display(), e))?;
            return Ok(Outcome::Usage);
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to enrich {}", args.target.display())))
        }
    };
    target_progress.finish_and_clear();

    info!(
        "Tagged {} of {} named nodes ({} nodes, {} tags added) in {:.1}s",
        summary.enriched,
        summary.named,
        summary.nodes,
        summary.tags_added,
        start.elapsed().as_secs_f64()
    );

    let stats = service.stats().to_string();
    info!("Match statistics:\n{}", stats);
    writeln!(diag, "{}", stats)?;

    Ok(Outcome::Done)
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn usage<D: Write>(diag: &mut D, message: fmt::Arguments) -> io::Result<()> {
    writeln!(diag, "{}", Args::command().render_usage())?;
    writeln!(diag, "error: {}", message)
}

/// Open an input, printing usage and the error when it cannot be read
fn open_or_usage<D: Write>(
    path: &Path,
    progress: &ProgressBar,
    diag: &mut D,
) -> io::Result<Option<Box<dyn BufRead>>> {
    match open_input(path, progress) {
        Ok(input) => Ok(Some(input)),
        Err(e) => {
            usage(diag, format_args!("cannot open {}: {}", path.display(), e))?;
            Ok(None)
        }
    }
}
