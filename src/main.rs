//! fraudscan CLI
//!
//! Runs the transaction analysis and prints its results as JSON on stdout. Logs go to
//! stderr. Exits with 1 on any pipeline error.

use clap::{Parser, Subcommand, ValueEnum};
use fraudscan::{Pipeline, PipelineConfig, PipelineError};
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

/// Density-based analysis of labelled card transactions
#[derive(Parser)]
#[command(name = "fraudscan")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample, rank, cluster and score a transactions CSV
    Analyze {
        /// CSV file with a header row and a 0/1 label column
        #[arg(default_value = "datasets/creditcard.csv")]
        path: PathBuf,
        /// Seed of the legitimate-row sample and the shuffle
        #[arg(long)]
        seed: Option<u64>,
        /// Number of legitimate rows to keep
        #[arg(long)]
        legitimate_sample_size: Option<usize>,
        /// Print only one part of the analysis
        #[arg(long, value_enum, default_value_t = Section::Bundle)]
        section: Section,
    },
    /// Print the figures of the complete dataset
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum Section {
    Bundle,
    Features,
    Metrics,
    Clusters,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Analyze { path, seed, legitimate_sample_size, section } => {
            analyze(path, seed, legitimate_sample_size, section)
        }
        Commands::Stats => print_json(&fraudscan::DatasetStats::reference()),
    };

    if let Err(err) = outcome {
        error!(%err, "Analysis failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn analyze(
    path: PathBuf,
    seed: Option<u64>,
    legitimate_sample_size: Option<usize>,
    section: Section,
) -> Result<(), PipelineError> {
    let mut builder = PipelineConfig::builder();
    if let Some(seed) = seed {
        builder = builder.sample_seed(seed);
    }
    if let Some(size) = legitimate_sample_size {
        builder = builder.legitimate_sample_size(size);
    }
    let pipeline = Pipeline::new(path, builder.build()?);

    match section {
        Section::Bundle => print_json(pipeline.bundle()?.as_ref()),
        Section::Features => print_json(pipeline.feature_table()?.as_ref()),
        Section::Metrics => print_json(pipeline.quality_metrics()?.as_ref()),
        Section::Clusters => print_json(pipeline.cluster_analysis()?.as_ref()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| PipelineError::InvariantViolation(format!("cannot serialize output: {err}")))?;
    println!("{json}");
    Ok(())
}
