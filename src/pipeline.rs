//! The three pipeline stages and the end-to-end runner.
//!
//! Stages communicate only through files: [`Preparer`] writes the split data
//! and feature schema, [`Trainer`] reads them and writes the scaler and model,
//! and [`Reporter`] reads everything back to produce the restock insights.

pub mod prepare;
pub mod report;
pub mod train;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::Result;

pub use prepare::{PrepareSummary, Preparer};
pub use report::{Insight, ReportSummary, Reporter};
pub use train::{TrainSummary, Trainer};

/// Fitted scaler, under the models directory.
pub const SCALER_FILE: &str = "scaler.bin";
/// Fitted model, under the models directory.
pub const MODEL_FILE: &str = "supply_chain_model.bin";
/// Trainer's evaluation on the test split, under the results directory.
pub const EVALUATION_REPORT_FILE: &str = "evaluation_report.txt";
/// Reporter's classification report, under the results directory.
pub const CLASSIFICATION_REPORT_FILE: &str = "classification_report.txt";
/// Actionable restock list, under the results directory.
pub const INSIGHTS_FILE: &str = "restock_insights.csv";
/// Ranked feature importances, under the results directory.
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.csv";

/// Summaries of a full `prepare`, `train`, `report` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub prepare: PrepareSummary,
    pub train: TrainSummary,
    pub report: ReportSummary,
}

/// Run all three stages in order, stopping at the first failure.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let prepare = Preparer::new(config.clone()).run()?;
    let train = Trainer::new(config.clone()).run()?;
    let report = Reporter::new(config.clone()).run()?;
    Ok(RunSummary {
        prepare,
        train,
        report,
    })
}
