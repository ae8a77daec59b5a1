//! CLI Argument Structures
//!
//! Command and argument definitions for the `optimus` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Iterative clustering and labelling of short descriptions
#[derive(Parser)]
#[command(name = "optimus")]
#[command(version = VERSION)]
#[command(about = "Optimus - cluster short descriptions and induce labels for them")]
#[command(long_about = "
Cluster free-text descriptions at increasing distance thresholds and label
each cluster with the first heuristic that accepts it. Every iteration is
recorded as a tier column of the output table.

Common Usage:

  # Run with the built-in defaults
  optimus run --data descriptions.csv

  # Layer a config file and override a threshold
  optimus run --config optimus.yml --data descriptions.csv --cutoff 4

  # Label leftovers with nearest neighbours and write a review table
  optimus run --data descriptions.csv --knn --review review.csv

  # Inspect or check configuration
  optimus print-default-config > optimus.yml
  optimus validate-config --config optimus.yml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster and label a CSV of descriptions
    Run(Box<RunArgs>),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Validate an Optimus configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),

    /// Add a new_labels column to a results table for review
    #[command(name = "prepare-review")]
    PrepareReview(PrepareReviewArgs),
}

/// Arguments of `optimus run`.
#[derive(Args, Default)]
pub struct RunArgs {
    /// Header-less CSV whose first column holds the descriptions
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// User configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base configuration file replacing the built-in defaults
    #[arg(long)]
    pub default_config: Option<PathBuf>,

    /// Where to write the tiered table
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Starting distance threshold
    #[arg(long)]
    pub distance: Option<f64>,

    /// Distance at which iteration stops
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Distance added after every iteration
    #[arg(long)]
    pub stepsize: Option<f64>,

    /// Acceptance threshold of the edit-distance strategy
    #[arg(long)]
    pub lev_threshold: Option<f64>,

    /// Acceptance threshold of the word-gram strategy
    #[arg(long)]
    pub wg_threshold: Option<f64>,

    /// Acceptance threshold of the character-gram strategy
    #[arg(long)]
    pub ng_threshold: Option<f64>,

    /// Smallest cluster kept for review
    #[arg(long)]
    pub min_cluster: Option<usize>,

    /// Embedding model: subword:<dim>, fastembed:<name> or a .vec/.txt file
    #[arg(short, long)]
    pub model: Option<String>,

    /// WordNet dictionary directory enabling the hypernym strategy
    #[arg(long)]
    pub wordnet: Option<PathBuf>,

    /// Re-cluster every current label at each iteration
    #[arg(long)]
    pub regroup_labels: bool,

    /// Label leftover words with nearest neighbours
    #[arg(long)]
    pub knn: bool,

    /// Where to write nearest-neighbour predictions
    #[arg(long)]
    pub knn_out: Option<PathBuf>,

    /// Also write a review table with a new_labels column
    #[arg(long)]
    pub review: Option<PathBuf>,
}

/// Arguments of `optimus validate-config`.
#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    #[arg(short, long)]
    pub config: PathBuf,

    /// Print every setting after validation
    #[arg(long)]
    pub detailed: bool,
}

/// Arguments of `optimus prepare-review`.
#[derive(Args)]
pub struct PrepareReviewArgs {
    /// Results table written by `optimus run`
    pub results: PathBuf,

    /// Where to write the review table
    #[arg(short, long)]
    pub out: PathBuf,

    /// Clusters with fewer rows are pre-filled as SKIPPED
    #[arg(long, default_value_t = 5)]
    pub min_cluster: usize,

    /// Number of tier columns to surface
    #[arg(long, default_value_t = 2)]
    pub tiers: usize,
}
