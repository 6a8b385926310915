//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::Label;
use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};

/// Train and test partitions of a feature matrix and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSet {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Vec<Label>,
    pub y_test: Vec<Label>,
}

/// Randomly partition rows into train and test sets.
///
/// Row indices are shuffled with a `StdRng` seeded from `seed`; the first
/// `ceil(n * test_fraction)` shuffled rows form the test set. Class balance is
/// not preserved.
pub fn train_test_split(
    features: &FeatureMatrix,
    labels: &[Label],
    test_fraction: f64,
    seed: u64,
) -> Result<PartitionSet> {
    if features.num_rows() != labels.len() {
        return Err(RestockError::schema_mismatch(format!(
            "{} feature rows for {} labels",
            features.num_rows(),
            labels.len()
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(RestockError::invalid_argument(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n = labels.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(RestockError::invalid_argument(format!(
            "cannot split {n} rows with test_fraction {test_fraction}: one side would be empty"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(PartitionSet {
        x_train: features.select_rows(train_idx),
        x_test: features.select_rows(test_idx),
        y_train: train_idx.iter().map(|&i| labels[i]).collect(),
        y_test: test_idx.iter().map(|&i| labels[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize) -> (FeatureMatrix, Vec<Label>) {
        let rows = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let features = FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap();
        let labels = (0..n).map(|i| (i % 2) as Label).collect();
        (features, labels)
    }

    #[test]
    fn test_split_sizes() {
        let (features, labels) = matrix(100);
        let parts = train_test_split(&features, &labels, 0.2, 42).unwrap();
        assert_eq!(parts.x_train.num_rows(), 80);
        assert_eq!(parts.x_test.num_rows(), 20);
        assert_eq!(parts.y_train.len(), 80);
        assert_eq!(parts.y_test.len(), 20);

        let (features, labels) = matrix(11);
        let parts = train_test_split(&features, &labels, 0.2, 42).unwrap();
        assert_eq!(parts.x_test.num_rows(), 3);
    }

    #[test]
    fn test_split_is_a_disjoint_permutation() {
        let (features, labels) = matrix(50);
        let parts = train_test_split(&features, &labels, 0.2, 7).unwrap();

        let mut seen: Vec<usize> = parts
            .x_train
            .rows()
            .iter()
            .chain(parts.x_test.rows().iter())
            .map(|row| row[0] as usize)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());

        // Labels travel with their rows.
        for (row, label) in parts.x_test.rows().iter().zip(&parts.y_test) {
            assert_eq!((row[0] as usize % 2) as Label, *label);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let (features, labels) = matrix(40);
        let a = train_test_split(&features, &labels, 0.25, 42).unwrap();
        let b = train_test_split(&features, &labels, 0.25, 42).unwrap();
        assert_eq!(a, b);

        let c = train_test_split(&features, &labels, 0.25, 43).unwrap();
        assert_ne!(a.x_test, c.x_test);
    }

    #[test]
    fn test_split_rejects_degenerate_inputs() {
        let (features, labels) = matrix(1);
        assert!(train_test_split(&features, &labels, 0.2, 42).is_err());

        let (features, labels) = matrix(10);
        assert!(train_test_split(&features, &labels, 0.0, 42).is_err());
        assert!(train_test_split(&features, &labels[..5], 0.2, 42).is_err());
    }
}
