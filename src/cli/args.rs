//! Command line argument parsing for the restock CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::Result;

/// Restock - supply restock prediction pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "restock")]
#[command(about = "Prepare supply data, train a restock classifier and report restock needs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct RestockArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format of the stage summary
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "RESTOCK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub paths: PathOverrides,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl RestockArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }

    /// Configuration file (or defaults) with the command line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        self.paths.apply(&mut config);
        if let Command::Train(train) | Command::Run(train) = &self.command {
            train.apply(&mut config);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Per-path overrides of the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct PathOverrides {
    /// Raw input CSV
    #[arg(long, value_name = "FILE", global = true)]
    pub input: Option<PathBuf>,

    /// Directory of the split data and feature schema
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory of the fitted scaler and model
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    /// Directory of the generated reports
    #[arg(long, value_name = "DIR", global = true)]
    pub results_dir: Option<PathBuf>,
}

impl PathOverrides {
    fn apply(&self, config: &mut PipelineConfig) {
        let paths = &mut config.paths;
        if let Some(input) = &self.input {
            paths.input = input.clone();
        }
        if let Some(dir) = &self.data_dir {
            paths.data_dir = dir.clone();
        }
        if let Some(dir) = &self.models_dir {
            paths.models_dir = dir.clone();
        }
        if let Some(dir) = &self.results_dir {
            paths.results_dir = dir.clone();
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load, encode and split the raw data
    Prepare,

    /// Fit the scaler and classifier, then evaluate on the test split
    Train(TrainArgs),

    /// Predict on the test split and write the restock insights
    Report,

    /// Run prepare, train and report in order
    Run(TrainArgs),
}

/// Arguments for training
#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// Select hyperparameters with a cross-validated grid search
    #[arg(long)]
    pub tune: bool,

    /// Worker threads (default: number of CPU cores)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Random seed of the classifier
    #[arg(long)]
    pub seed: Option<u64>,
}

impl TrainArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if self.tune {
            config.training.tune = true;
        }
        if let Some(jobs) = self.jobs {
            config.training.n_jobs = Some(jobs);
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
