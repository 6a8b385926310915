//! Reporting stage: predictions on the test split turned into an actionable
//! restock list.

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::data::artifacts;
use crate::data::encoder::decode_category;
use crate::data::frame::FeatureMatrix;
use crate::data::schema::FeatureSchema;
use crate::data::{Label, RESTOCK};
use crate::error::{RestockError, Result};
use crate::model::forest::RandomForest;
use crate::model::metrics::ClassificationReport;
use crate::model::scaler::StandardScaler;
use crate::pipeline::{
    CLASSIFICATION_REPORT_FILE, FEATURE_IMPORTANCE_FILE, INSIGHTS_FILE, MODEL_FILE, SCALER_FILE,
};

/// Categorical columns recovered for the insights file, in output order.
pub const INSIGHT_COLUMNS: [&str; 2] = ["Region", "Supply_Category"];

/// One row of `restock_insights.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub region: String,
    pub supply_category: String,
    pub predicted_restock: Label,
}

/// What the reporting stage produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub test_rows: usize,
    pub accuracy: f64,
    pub actionable_rows: usize,
    pub insights_path: PathBuf,
    pub classification_report_path: PathBuf,
    pub feature_importance_path: PathBuf,
}

/// Applies the persisted scaler and model to the persisted test split.
#[derive(Debug, Clone)]
pub struct Reporter {
    config: PipelineConfig,
}

impl Reporter {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<ReportSummary> {
        let paths = &self.config.paths;

        let model = load_model(paths.models_dir.join(MODEL_FILE))?;
        let scaler = load_scaler(paths.models_dir.join(SCALER_FILE))?;
        let (x_test, y_test, schema) = artifacts::load_test_data(&paths.data_dir)?;
        x_test.ensure_columns(model.feature_names(), "model features")?;

        let predictions = predict(&model, &scaler.transform(&x_test)?)?;

        fs::create_dir_all(&paths.results_dir)?;

        let report = ClassificationReport::new(&y_test, &predictions)?;
        let classification_report_path = paths.results_dir.join(CLASSIFICATION_REPORT_FILE);
        fs::write(&classification_report_path, report.to_string())?;
        info!(
            "Classification report saved to '{}'",
            classification_report_path.display()
        );

        let feature_importance_path = paths.results_dir.join(FEATURE_IMPORTANCE_FILE);
        write_feature_importance(&model, &feature_importance_path)?;

        let decoded = decode_insight_columns(&x_test, &schema)?;
        let insights = filter_actionable(&decoded, &predictions)?;
        let insights_path = paths.results_dir.join(INSIGHTS_FILE);
        write_insights(&insights, &insights_path)?;

        Ok(ReportSummary {
            test_rows: x_test.num_rows(),
            accuracy: report.accuracy,
            actionable_rows: insights.len(),
            insights_path,
            classification_report_path,
            feature_importance_path,
        })
    }
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<RandomForest> {
    RandomForest::load(path)
}

pub fn load_scaler<P: AsRef<Path>>(path: P) -> Result<StandardScaler> {
    StandardScaler::load(path)
}

/// One label per row of the scaled test matrix, in row order.
pub fn predict(model: &RandomForest, x_scaled: &FeatureMatrix) -> Result<Vec<Label>> {
    let predictions = model.predict(x_scaled)?;
    info!("Predictions made on test data ({} rows)", predictions.len());
    Ok(predictions)
}

/// Recover the [`INSIGHT_COLUMNS`] categories of every row of the unscaled
/// test matrix. The result holds one vector per insight column.
pub fn decode_insight_columns(x_test: &FeatureMatrix, schema: &FeatureSchema) -> Result<Vec<Vec<String>>> {
    INSIGHT_COLUMNS
        .iter()
        .map(|&name| {
            let column = schema.category(name).ok_or_else(|| {
                RestockError::schema_mismatch(format!("column '{name}' is not one-hot encoded"))
            })?;
            Ok(decode_category(x_test.columns(), x_test.rows(), column))
        })
        .collect()
}

/// Keep the rows predicted as [`RESTOCK`].
pub fn filter_actionable(decoded: &[Vec<String>], predictions: &[Label]) -> Result<Vec<Insight>> {
    let [regions, categories] = decoded else {
        return Err(RestockError::invalid_argument(format!(
            "expected {} decoded columns, got {}",
            INSIGHT_COLUMNS.len(),
            decoded.len()
        )));
    };
    if regions.len() != predictions.len() || categories.len() != predictions.len() {
        return Err(RestockError::invalid_argument(format!(
            "{} predictions for {} decoded rows",
            predictions.len(),
            regions.len()
        )));
    }

    let insights: Vec<Insight> = predictions
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label == RESTOCK)
        .map(|(i, &label)| Insight {
            region: regions[i].clone(),
            supply_category: categories[i].clone(),
            predicted_restock: label,
        })
        .collect();

    if insights.is_empty() {
        warn!("No rows predicted as needing restock");
    } else {
        info!("{} of {} rows need restocking", insights.len(), predictions.len());
    }
    Ok(insights)
}

/// Write the insights with a header, even when there are no rows.
pub fn write_insights(insights: &[Insight], path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([INSIGHT_COLUMNS[0], INSIGHT_COLUMNS[1], "Predicted_Restock"])?;
    for insight in insights {
        writer.write_record([
            insight.region.as_str(),
            insight.supply_category.as_str(),
            &insight.predicted_restock.to_string(),
        ])?;
    }
    writer.flush()?;
    info!("Insights saved to '{}'", path.display());
    Ok(())
}

/// Write `feature,importance` rows, most important first.
pub fn write_feature_importance(model: &RandomForest, path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["feature", "importance"])?;
    for (feature, importance) in model.ranked_importances() {
        writer.write_record([feature, format!("{importance:.6}")])?;
    }
    writer.flush()?;
    info!("Feature importance saved to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::OneHotEncoder;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn schema() -> FeatureSchema {
        let encoder = OneHotEncoder::fit(
            &strings(&["Region", "Supply_Category"]),
            &[
                strings(&["East", "North", "West"]),
                strings(&["Masks", "Vaccines", "Masks"]),
            ],
        )
        .unwrap();
        FeatureSchema::new(strings(&["Stock"]), "Restock_Flag".to_string(), encoder)
    }

    #[test]
    fn test_decode_insight_columns() {
        let schema = schema();
        assert_eq!(
            schema.columns,
            strings(&["Stock", "Region_North", "Region_West", "Supply_Category_Vaccines"])
        );
        let x = FeatureMatrix::new(
            schema.columns.clone(),
            vec![
                vec![3.0, 0.0, 1.0, 0.0],
                vec![5.0, 0.0, 0.0, 1.0],
                vec![1.0, 1.0, 0.0, 0.0],
            ],
        )
        .unwrap();

        let decoded = decode_insight_columns(&x, &schema).unwrap();
        assert_eq!(decoded[0], strings(&["West", "East", "North"]));
        assert_eq!(decoded[1], strings(&["Masks", "Vaccines", "Masks"]));
    }

    #[test]
    fn test_filter_actionable() {
        let decoded = vec![strings(&["East", "West", "North"]), strings(&["Masks", "Gloves", "Masks"])];
        let insights = filter_actionable(&decoded, &[1, 0, 1]).unwrap();
        assert_eq!(
            insights,
            vec![
                Insight {
                    region: "East".to_string(),
                    supply_category: "Masks".to_string(),
                    predicted_restock: 1,
                },
                Insight {
                    region: "North".to_string(),
                    supply_category: "Masks".to_string(),
                    predicted_restock: 1,
                },
            ]
        );
        assert!(filter_actionable(&decoded, &[1, 0]).is_err());
    }

    #[test]
    fn test_empty_insights_keep_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INSIGHTS_FILE);
        let decoded = vec![strings(&["East"]), strings(&["Masks"])];
        let insights = filter_actionable(&decoded, &[0]).unwrap();
        write_insights(&insights, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Region,Supply_Category,Predicted_Restock\n"
        );
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_model(dir.path().join(MODEL_FILE)),
            Err(RestockError::NotFound(_))
        ));
        assert!(matches!(
            load_scaler(dir.path().join(SCALER_FILE)),
            Err(RestockError::NotFound(_))
        ));
    }
}
