//! Random forest classifier.

use std::fs;
use std::path::Path;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::Label;
use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};
use crate::model::tree::{DecisionTree, TreeParams, argmax, bootstrap};

/// Hyperparameters of a random forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum tree depth (None = unlimited).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Seed of bootstrap sampling and per-split feature draws.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl std::fmt::Display for ForestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self
            .max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}",
            self.n_estimators, depth, self.min_samples_split
        )
    }
}

/// Model metadata for tracking model information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier.
    pub name: String,
    /// Crate version that produced the model.
    pub version: String,
    /// Training timestamp.
    pub trained_at: chrono::DateTime<chrono::Utc>,
    /// Number of training rows used.
    pub training_examples: usize,
    /// Mean cross-validated accuracy, when the model came out of a grid search.
    pub cv_accuracy: Option<f64>,
}

/// Bagged ensemble of [`DecisionTree`]s.
///
/// Each tree sees a bootstrap sample of the training rows and considers
/// `floor(sqrt(n_features))` random features per split. Tree `i` is grown from
/// its own seed derived from `params.seed` and `i`, so the fitted forest does
/// not depend on how rayon schedules the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    classes: Vec<Label>,
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    metadata: ModelMetadata,
}

impl RandomForest {
    /// Fit a forest on `x` and `y`.
    pub fn fit(x: &FeatureMatrix, y: &[Label], params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(RestockError::invalid_argument("cannot fit on zero rows"));
        }
        if x.num_rows() != y.len() {
            return Err(RestockError::schema_mismatch(format!(
                "{} feature rows for {} labels",
                x.num_rows(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(RestockError::invalid_argument("n_estimators must be positive"));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let n_features = x.num_columns();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some(((n_features as f64).sqrt() as usize).max(1)),
        };
        let rows = x.rows();
        let n_classes = classes.len();

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, i));
                let samples = bootstrap(rows.len(), &mut rng);
                DecisionTree::fit(rows, &encoded, n_classes, &samples, &tree_params, &mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0; n_features];
        for tree in &trees {
            for (total, value) in feature_importances.iter_mut().zip(tree.feature_importances()) {
                *total += value;
            }
        }
        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            for value in &mut feature_importances {
                *value /= sum;
            }
        }

        debug!(
            "Fitted {} trees ({}), mean depth {:.1}",
            trees.len(),
            params,
            trees.iter().map(|t| t.depth() as f64).sum::<f64>() / trees.len() as f64
        );

        Ok(Self {
            params: *params,
            classes,
            feature_names: x.columns().to_vec(),
            trees,
            feature_importances,
            metadata: ModelMetadata {
                name: "RandomForest".to_string(),
                version: crate::VERSION.to_string(),
                trained_at: chrono::Utc::now(),
                training_examples: x.num_rows(),
                cv_accuracy: None,
            },
        })
    }

    /// Mean class probabilities over all trees, one vector per row.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        self.check_width(x)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.rows()
            .iter()
            .map(|row| {
                let mut proba = vec![0.0; self.classes.len()];
                for tree in &self.trees {
                    for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                        *acc += p;
                    }
                }
                proba.iter_mut().for_each(|p| *p /= n_trees);
                proba
            })
            .collect())
    }

    /// Predicted label per row, in row order.
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|proba| self.classes[argmax(proba)])
            .collect())
    }

    fn check_width(&self, x: &FeatureMatrix) -> Result<()> {
        if x.num_columns() != self.feature_names.len() {
            return Err(RestockError::schema_mismatch(format!(
                "model expects {} features, got {}",
                self.feature_names.len(),
                x.num_columns()
            )));
        }
        Ok(())
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Distinct training labels, ascending.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Normalized mean impurity decrease per feature.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// `(feature, importance)` pairs, most important first.
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub(crate) fn set_cv_accuracy(&mut self, accuracy: f64) {
        self.metadata.cv_accuracy = Some(accuracy);
    }

    /// Serialize the model to `path` with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bincode::serialize(self)?)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Load a model written by [`RandomForest::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RestockError::not_found(path));
        }
        let bytes = fs::read(path)?;
        let model: RandomForest = bincode::deserialize(&bytes)?;
        info!("Model loaded from {}", path.display());
        Ok(model)
    }
}

/// Seed of the `index`-th tree.
fn tree_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
