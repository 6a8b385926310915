//! Preparation stage: raw CSV to persisted train/test artifacts.

use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::data::artifacts;
use crate::data::loader::CsvLoader;
use crate::data::preprocess::Preprocessor;
use crate::data::split::train_test_split;
use crate::error::Result;

/// What the preparation stage produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareSummary {
    pub input: PathBuf,
    pub data_dir: PathBuf,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub feature_columns: Vec<String>,
}

/// Loads, encodes, splits and persists the dataset.
#[derive(Debug, Clone)]
pub struct Preparer {
    config: PipelineConfig,
}

impl Preparer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<PrepareSummary> {
        let paths = &self.config.paths;
        let data = &self.config.data;

        let raw = CsvLoader::new()
            .with_delimiter(data.delimiter)?
            .load(&paths.input)?;

        let preprocessed = Preprocessor::new(data.categorical_columns.clone(), data.label_column.clone())
            .preprocess(&raw)?;

        let parts = train_test_split(
            &preprocessed.features,
            &preprocessed.labels,
            data.test_fraction,
            data.seed,
        )?;
        info!(
            "Split {} rows into {} training and {} test rows (seed {})",
            raw.num_rows(),
            parts.x_train.num_rows(),
            parts.x_test.num_rows(),
            data.seed
        );

        artifacts::persist(&parts, &preprocessed.schema, &paths.data_dir)?;
        info!("Data preprocessing completed and saved to '{}'", paths.data_dir.display());

        Ok(PrepareSummary {
            input: paths.input.clone(),
            data_dir: paths.data_dir.clone(),
            rows: raw.num_rows(),
            train_rows: parts.x_train.num_rows(),
            test_rows: parts.x_test.num_rows(),
            feature_columns: preprocessed.schema.columns.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::artifacts::load_persisted;
    use crate::error::RestockError;
    use std::fs;

    fn config_in(dir: &std::path::Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths.input = dir.join("supply.csv");
        config.paths.data_dir = dir.join("data");
        config
    }

    #[test]
    fn test_prepare_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("Region,Supply_Category,Month,Stock,Restock_Flag\n");
        for i in 0..10 {
            let region = ["North", "South"][i % 2];
            csv.push_str(&format!("{region},Masks,Jan,{i},{}\n", i % 2));
        }
        fs::write(dir.path().join("supply.csv"), csv).unwrap();

        let summary = Preparer::new(config_in(dir.path())).run().unwrap();
        assert_eq!(summary.rows, 10);
        assert_eq!(summary.test_rows, 2);
        assert_eq!(summary.train_rows, 8);
        assert_eq!(summary.feature_columns, vec!["Stock", "Region_South"]);

        let (parts, schema) = load_persisted(dir.path().join("data")).unwrap();
        assert_eq!(parts.x_train.num_rows(), 8);
        assert_eq!(schema.columns, summary.feature_columns);
    }

    #[test]
    fn test_prepare_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = Preparer::new(config_in(dir.path())).run();
        assert!(matches!(result, Err(RestockError::NotFound(_))));
        assert!(!dir.path().join("data").exists());
    }
}
