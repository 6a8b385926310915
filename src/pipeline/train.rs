//! Training stage: scale, fit, evaluate and persist.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, TrainingConfig};
use crate::data::Label;
use crate::data::artifacts::load_persisted;
use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};
use crate::model::forest::{ForestParams, RandomForest};
use crate::model::metrics::Evaluation;
use crate::model::scaler::StandardScaler;
use crate::model::search::GridSearch;
use crate::pipeline::{EVALUATION_REPORT_FILE, MODEL_FILE, SCALER_FILE};

/// What the training stage produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub accuracy: f64,
    pub params: ForestParams,
    pub tuned: bool,
    pub cv_accuracy: Option<f64>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub report_path: PathBuf,
}

/// Fits the scaler and classifier on the persisted training split.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: PipelineConfig,
}

impl Trainer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<TrainSummary> {
        let paths = &self.config.paths;
        let training = &self.config.training;

        let (parts, _schema) = load_persisted(&paths.data_dir)?;

        let (scaler, x_train, x_test) = scale(&parts.x_train, &parts.x_test)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(training.threads())
            .build()
            .map_err(|e| RestockError::other(format!("failed to build thread pool: {e}")))?;
        let model = pool.install(|| train(&x_train, &parts.y_train, training))?;

        // Scaler and model are written together, only once fitting succeeded.
        let scaler_path = paths.models_dir.join(SCALER_FILE);
        scaler.save(&scaler_path)?;
        let model_path = paths.models_dir.join(MODEL_FILE);
        save_model(&model, &model_path)?;

        let report_path = paths.results_dir.join(EVALUATION_REPORT_FILE);
        let evaluation = evaluate(&model, &x_test, &parts.y_test, &report_path)?;

        Ok(TrainSummary {
            accuracy: evaluation.accuracy,
            params: *model.params(),
            tuned: training.tune,
            cv_accuracy: model.metadata().cv_accuracy,
            train_rows: x_train.num_rows(),
            test_rows: x_test.num_rows(),
            model_path,
            scaler_path,
            report_path,
        })
    }
}

/// Fit a scaler on the training matrix and apply it to both matrices.
pub fn scale(
    x_train: &FeatureMatrix,
    x_test: &FeatureMatrix,
) -> Result<(StandardScaler, FeatureMatrix, FeatureMatrix)> {
    let (scaler, train_scaled) = StandardScaler::fit_transform(x_train)?;
    let test_scaled = scaler.transform(x_test)?;
    Ok((scaler, train_scaled, test_scaled))
}

/// Fit a forest with the configured parameters, or through the grid search
/// when `tune` is set.
pub fn train(x: &FeatureMatrix, y: &[Label], config: &TrainingConfig) -> Result<RandomForest> {
    if config.tune {
        info!("Starting hyperparameter tuning...");
        let outcome = GridSearch::new(config.grid.clone(), config.cv_folds, config.seed).fit(x, y)?;
        return Ok(outcome.best_model);
    }

    let params = ForestParams {
        n_estimators: config.n_estimators,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        seed: config.seed,
    };
    info!("Training random forest ({params}) on {} rows", x.num_rows());
    let model = RandomForest::fit(x, y, &params)?;
    info!("Model training completed.");
    Ok(model)
}

/// Score `model` on the test split and write the text report to `path`.
pub fn evaluate(model: &RandomForest, x_test: &FeatureMatrix, y_test: &[Label], path: &Path) -> Result<Evaluation> {
    let predictions = model.predict(x_test)?;
    let evaluation = Evaluation::new(y_test, &predictions)?;
    info!("Model Accuracy: {:.2}%", evaluation.accuracy * 100.0);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, evaluation.to_string())?;
    info!("Evaluation report saved to '{}'", path.display());
    Ok(evaluation)
}

/// Persist the fitted model.
pub fn save_model(model: &RandomForest, path: &Path) -> Result<()> {
    model.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::new(vec!["stock".to_string(), "demand".to_string()], rows).unwrap()
    }

    fn dataset() -> (FeatureMatrix, Vec<Label>) {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 10) as f64 * 10.0, (i % 4) as f64])
            .collect();
        let labels = rows.iter().map(|r| i64::from(r[0] < 40.0)).collect();
        (matrix(rows), labels)
    }

    #[test]
    fn test_scale_uses_training_statistics() {
        let train = matrix(vec![vec![0.0, 1.0], vec![2.0, 1.0]]);
        let test = matrix(vec![vec![4.0, 3.0]]);
        let (scaler, train_scaled, test_scaled) = scale(&train, &test).unwrap();
        assert_eq!(scaler.mean(), &[1.0, 1.0]);
        assert_eq!(train_scaled.rows()[0], vec![-1.0, 0.0]);
        assert_eq!(test_scaled.rows()[0], vec![3.0, 2.0]);
    }

    #[test]
    fn test_train_with_fixed_parameters() {
        let (x, y) = dataset();
        let config = TrainingConfig {
            n_estimators: 10,
            max_depth: Some(4),
            ..TrainingConfig::default()
        };
        let model = train(&x, &y, &config).unwrap();
        assert_eq!(model.n_trees(), 10);
        assert_eq!(model.params().max_depth, Some(4));
        assert_eq!(model.metadata().cv_accuracy, None);
    }

    #[test]
    fn test_train_with_tuning() {
        let (x, y) = dataset();
        let mut config = TrainingConfig {
            tune: true,
            cv_folds: 3,
            ..TrainingConfig::default()
        };
        config.grid.n_estimators = vec![5];
        config.grid.max_depth = vec![Some(2), None];
        config.grid.min_samples_split = vec![2];

        let model = train(&x, &y, &config).unwrap();
        assert_eq!(model.n_trees(), 5);
        assert!(model.metadata().cv_accuracy.is_some());
    }

    #[test]
    fn test_evaluate_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let (x, y) = dataset();
        let config = TrainingConfig {
            n_estimators: 10,
            ..TrainingConfig::default()
        };
        let model = train(&x, &y, &config).unwrap();

        let path = dir.path().join("results").join(EVALUATION_REPORT_FILE);
        let evaluation = evaluate(&model, &x, &y, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Model Accuracy: "));
        assert!(text.contains("Classification Report:"));
        assert!(evaluation.accuracy > 0.9);
    }
}
