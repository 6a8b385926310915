//! Pipeline configuration.
//!
//! Every stage reads its paths and parameters from a [`PipelineConfig`]. The
//! configuration can be loaded from a JSON file; any field left out of the
//! file takes its default value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RestockError, Result};
use crate::logging::LoggingConfig;

/// Default categorical columns of the supply dataset.
pub const DEFAULT_CATEGORICAL_COLUMNS: [&str; 3] = ["Region", "Supply_Category", "Month"];

/// Default label column of the supply dataset.
pub const DEFAULT_LABEL_COLUMN: &str = "Restock_Flag";

/// Top-level configuration shared by all stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input and artifact locations.
    pub paths: PathsConfig,
    /// Loading and preprocessing options.
    pub data: DataConfig,
    /// Classifier and grid search options.
    pub training: TrainingConfig,
    /// Log level and destination.
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RestockError::not_found(path));
        }
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is within its accepted range.
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.training.validate()
    }
}

/// Locations of the input file and of the three artifact directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw input CSV.
    pub input: PathBuf,
    /// Directory holding the split feature/label files and the feature schema.
    pub data_dir: PathBuf,
    /// Directory holding the fitted scaler and model.
    pub models_dir: PathBuf,
    /// Directory receiving the human-readable reports.
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("dataset/supply-data.csv"),
            data_dir: PathBuf::from("dataset"),
            models_dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Options for loading, encoding and splitting the raw data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Field delimiter of the input file.
    pub delimiter: char,
    /// Columns to one-hot encode, in output order.
    pub categorical_columns: Vec<String>,
    /// Binary label column.
    pub label_column: String,
    /// Share of rows assigned to the test partition.
    pub test_fraction: f64,
    /// Seed of the row shuffle.
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            categorical_columns: DEFAULT_CATEGORICAL_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl DataConfig {
    fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(RestockError::invalid_config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if !self.delimiter.is_ascii() {
            return Err(RestockError::invalid_config("delimiter must be ASCII"));
        }
        if self.label_column.is_empty() {
            return Err(RestockError::invalid_config("label_column is empty"));
        }
        if self.categorical_columns.contains(&self.label_column) {
            return Err(RestockError::invalid_config(format!(
                "label column '{}' is also listed as categorical",
                self.label_column
            )));
        }
        Ok(())
    }
}

/// Random forest hyperparameters and grid search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Run the cross-validated grid search instead of the fixed defaults.
    pub tune: bool,
    /// Number of trees in the forest.
    pub n_estimators: usize,
    /// Maximum tree depth (None = grow until pure).
    pub max_depth: Option<usize>,
    /// Minimum samples needed to split a node.
    pub min_samples_split: usize,
    /// Seed of bootstrap sampling and feature selection.
    pub seed: u64,
    /// Number of cross-validation folds.
    pub cv_folds: usize,
    /// Worker threads for tree fitting and grid search.
    /// If None, uses the number of CPU cores.
    pub n_jobs: Option<usize>,
    /// Grid searched when `tune` is set.
    pub grid: ParamGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            tune: false,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
            cv_folds: 5,
            n_jobs: None,
            grid: ParamGrid::default(),
        }
    }
}

impl TrainingConfig {
    /// Effective worker count.
    pub fn threads(&self) -> usize {
        self.n_jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(RestockError::invalid_config("n_estimators must be positive"));
        }
        if self.min_samples_split < 2 {
            return Err(RestockError::invalid_config(
                "min_samples_split must be at least 2",
            ));
        }
        if self.cv_folds < 2 {
            return Err(RestockError::invalid_config("cv_folds must be at least 2"));
        }
        self.grid.validate()
    }
}

/// Hyperparameter grid for the exhaustive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![Some(10), Some(20), None],
            min_samples_split: vec![2, 5, 10],
        }
    }
}

impl ParamGrid {
    /// Number of combinations in the grid.
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.min_samples_split.len()
    }

    /// Whether the grid has no combinations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RestockError::invalid_config("parameter grid is empty"));
        }
        if self.n_estimators.contains(&0) {
            return Err(RestockError::invalid_config(
                "grid n_estimators values must be positive",
            ));
        }
        if self.min_samples_split.iter().any(|&m| m < 2) {
            return Err(RestockError::invalid_config(
                "grid min_samples_split values must be at least 2",
            ));
        }
        Ok(())
    }
}
