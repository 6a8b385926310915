//! Exhaustive hyperparameter search with k-fold cross-validation.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ParamGrid;
use crate::data::Label;
use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};
use crate::model::forest::{ForestParams, RandomForest};
use crate::model::metrics::accuracy;

/// Contiguous, unshuffled k-fold splitter. The first `n % k` folds hold one
/// extra row.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// `(train_indices, validation_indices)` per fold.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(RestockError::invalid_argument(format!(
                "k-fold needs at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if n_samples < self.n_splits {
            return Err(RestockError::invalid_argument(format!(
                "cannot run {}-fold cross-validation on {} rows",
                self.n_splits, n_samples
            )));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let validation: Vec<usize> = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
            folds.push((train, validation));
            start = end;
        }
        Ok(folds)
    }
}

/// Cross-validation outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub fold_accuracies: Vec<f64>,
    pub mean_accuracy: f64,
}

/// Result of a grid search: the refitted winner plus every candidate's score.
#[derive(Debug)]
pub struct SearchOutcome {
    pub best_model: RandomForest,
    pub best: CandidateScore,
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over forest hyperparameters.
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    folds: KFold,
    seed: u64,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, cv_folds: usize, seed: u64) -> Self {
        Self {
            grid,
            folds: KFold::new(cv_folds),
            seed,
        }
    }

    /// Every grid point, in a fixed order (n_estimators outermost).
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut candidates = Vec::with_capacity(self.grid.len());
        for &n_estimators in &self.grid.n_estimators {
            for &max_depth in &self.grid.max_depth {
                for &min_samples_split in &self.grid.min_samples_split {
                    candidates.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                        seed: self.seed,
                    });
                }
            }
        }
        candidates
    }

    /// Score every grid point, pick the best mean accuracy (earliest grid
    /// point on ties) and refit it on all of `x`.
    ///
    /// Cost is `|grid| * k` forest fits plus the final refit. Candidates run
    /// in parallel; the selection does not depend on the thread count.
    pub fn fit(&self, x: &FeatureMatrix, y: &[Label]) -> Result<SearchOutcome> {
        if self.grid.is_empty() {
            return Err(RestockError::invalid_argument("parameter grid is empty"));
        }
        let folds = self.folds.split(x.num_rows())?;
        let candidates = self.candidates();
        info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            folds.len(),
            candidates.len(),
            folds.len() * candidates.len()
        );

        let scores = candidates
            .par_iter()
            .map(|params| score_candidate(x, y, params, &folds))
            .collect::<Result<Vec<CandidateScore>>>()?;

        let mut best_idx = 0;
        for (idx, score) in scores.iter().enumerate() {
            debug!(
                "[CV] {}: mean accuracy {:.4}",
                score.params, score.mean_accuracy
            );
            if score.mean_accuracy > scores[best_idx].mean_accuracy {
                best_idx = idx;
            }
        }
        let best = scores[best_idx].clone();
        info!(
            "Best hyperparameters found: {} (mean CV accuracy {:.4})",
            best.params, best.mean_accuracy
        );

        let mut best_model = RandomForest::fit(x, y, &best.params)?;
        best_model.set_cv_accuracy(best.mean_accuracy);

        Ok(SearchOutcome {
            best_model,
            best,
            candidates: scores,
        })
    }
}

fn score_candidate(
    x: &FeatureMatrix,
    y: &[Label],
    params: &ForestParams,
    folds: &[(Vec<usize>, Vec<usize>)],
) -> Result<CandidateScore> {
    let fold_accuracies = folds
        .iter()
        .map(|(train_idx, valid_idx)| {
            let x_train = x.select_rows(train_idx);
            let y_train: Vec<Label> = train_idx.iter().map(|&i| y[i]).collect();
            let model = RandomForest::fit(&x_train, &y_train, params)?;

            let x_valid = x.select_rows(valid_idx);
            let y_valid: Vec<Label> = valid_idx.iter().map(|&i| y[i]).collect();
            accuracy(&y_valid, &model.predict(&x_valid)?)
        })
        .collect::<Result<Vec<f64>>>()?;

    let mean_accuracy = fold_accuracies.iter().sum::<f64>() / fold_accuracies.len() as f64;
    Ok(CandidateScore {
        params: *params,
        fold_accuracies,
        mean_accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kfold_sizes() {
        let folds = KFold::new(5).split(12).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);

        let mut all: Vec<usize> = folds.iter().flat_map(|(_, v)| v.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..12).collect::<Vec<_>>());

        for (train, valid) in &folds {
            assert_eq!(train.len() + valid.len(), 12);
            assert!(train.iter().all(|i| !valid.contains(i)));
        }
    }

    #[test]
    fn test_kfold_rejects_too_few_rows() {
        assert!(KFold::new(5).split(4).is_err());
        assert!(KFold::new(1).split(10).is_err());
    }

    #[test]
    fn test_candidates_order() {
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![Some(2), None],
            min_samples_split: vec![2],
        };
        let search = GridSearch::new(grid, 3, 42);
        let candidates = search.candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].n_estimators, 5);
        assert_eq!(candidates[0].max_depth, Some(2));
        assert_eq!(candidates[1].max_depth, None);
        assert_eq!(candidates[3].n_estimators, 10);
    }

    #[test]
    fn test_search_selects_and_refits() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 10) as f64, (i % 3) as f64]).collect();
        let y: Vec<Label> = rows.iter().map(|r| if r[0] >= 5.0 { 1 } else { 0 }).collect();
        let x = FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap();

        let outcome = GridSearch::new(grid(), 4, 42).fit(&x, &y).unwrap();

        assert_eq!(outcome.candidates.len(), 4);
        let best_mean = outcome
            .candidates
            .iter()
            .map(|c| c.mean_accuracy)
            .fold(f64::MIN, f64::max);
        assert_eq!(outcome.best.mean_accuracy, best_mean);
        assert_eq!(outcome.best_model.params(), &outcome.best.params);
        assert_eq!(outcome.best_model.metadata().cv_accuracy, Some(best_mean));
        assert!(outcome.candidates.iter().all(|c| c.fold_accuracies.len() == 4));

        let again = GridSearch::new(grid(), 4, 42).fit(&x, &y).unwrap();
        assert_eq!(again.best, outcome.best);
    }

    #[test]
    fn test_ties_keep_earliest_candidate() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % 10) as f64, (i % 4) as f64]).collect();
        let y: Vec<Label> = rows.iter().map(|r| if r[0] >= 5.0 { 1 } else { 0 }).collect();
        let x = FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap();
        // Stumps never reach a node small enough for min_samples_split to matter.
        let grid = ParamGrid {
            n_estimators: vec![5],
            max_depth: vec![Some(1)],
            min_samples_split: vec![4, 2, 3],
        };

        let outcome = GridSearch::new(grid, 3, 7).fit(&x, &y).unwrap();

        let first = &outcome.candidates[0];
        assert!(
            outcome
                .candidates
                .iter()
                .all(|c| c.mean_accuracy == first.mean_accuracy)
        );
        assert_eq!(outcome.best.params.min_samples_split, 4);
        assert_eq!(outcome.best.params, first.params);
    }

    fn grid() -> ParamGrid {
        ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![Some(1), None],
            min_samples_split: vec![2],
        }
    }
}
