//! Per-column standardization.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};

/// Zero-mean, unit-variance scaler fitted on training data only.
///
/// Statistics use the population variance. Columns with zero variance keep
/// a scale of `1.0`, so they are only centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    samples_seen: usize,
}

impl StandardScaler {
    /// Compute column means and standard deviations of `matrix`.
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self> {
        if matrix.is_empty() {
            return Err(RestockError::invalid_argument(
                "cannot fit a scaler on an empty matrix",
            ));
        }

        let n = matrix.num_rows() as f64;
        let width = matrix.num_columns();
        let mut mean = vec![0.0; width];
        for row in matrix.rows() {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = vec![0.0; width];
        for row in matrix.rows() {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }
        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            columns: matrix.columns().to_vec(),
            mean,
            scale,
            samples_seen: matrix.num_rows(),
        })
    }

    /// Apply `(x - mean) / scale` to every value.
    ///
    /// The matrix must have exactly the columns the scaler was fitted on.
    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
        matrix.ensure_columns(&self.columns, "scaler input")?;
        let rows = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();
        matrix.with_rows(rows)
    }

    /// Fit on `matrix` and return it transformed.
    pub fn fit_transform(matrix: &FeatureMatrix) -> Result<(Self, FeatureMatrix)> {
        let scaler = Self::fit(matrix)?;
        let scaled = scaler.transform(matrix)?;
        Ok((scaler, scaled))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Serialize the scaler to `path` with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bincode::serialize(self)?)?;
        info!("Feature scaler saved as '{}'", path.display());
        Ok(())
    }

    /// Load a scaler written by [`StandardScaler::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RestockError::not_found(path));
        }
        let bytes = fs::read(path)?;
        let scaler: StandardScaler = bincode::deserialize(&bytes)?;
        info!("Scaler loaded from {}", path.display());
        Ok(scaler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap()
    }

    #[test]
    fn test_fit_statistics() {
        let train = matrix(vec![vec![1.0, 5.0], vec![3.0, 5.0]]);
        let scaler = StandardScaler::fit(&train).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 5.0]);
        assert_eq!(scaler.scale(), &[1.0, 1.0]);
        assert_eq!(scaler.samples_seen(), 2);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = matrix(vec![vec![2.0, 10.0], vec![4.0, 20.0], vec![6.0, 30.0]]);
        let test = matrix(vec![vec![8.0, 0.0], vec![-1.0, 25.0]]);
        let scaler = StandardScaler::fit(&train).unwrap();
        let scaled = scaler.transform(&test).unwrap();

        for (row_in, row_out) in test.rows().iter().zip(scaled.rows()) {
            for j in 0..2 {
                let expected = (row_in[j] - scaler.mean()[j]) / scaler.scale()[j];
                assert!((row_out[j] - expected).abs() < 1e-12);
            }
        }
        let std_a = (8.0f64 / 3.0).sqrt();
        assert!((scaled.rows()[0][0] - 4.0 / std_a).abs() < 1e-12);
    }

    #[test]
    fn test_fit_transform_centers_training_data() {
        let train = matrix(vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 9.0]]);
        let (_, scaled) = StandardScaler::fit_transform(&train).unwrap();
        for j in 0..2 {
            let mean: f64 = scaled.rows().iter().map(|r| r[j]).sum::<f64>() / 3.0;
            let var: f64 = scaled.rows().iter().map(|r| r[j] * r[j]).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_column_mismatch() {
        let scaler = StandardScaler::fit(&matrix(vec![vec![1.0, 2.0]])).unwrap();
        let other = FeatureMatrix::new(vec!["a".to_string(), "c".to_string()], vec![vec![1.0, 2.0]])
            .unwrap();
        assert!(matches!(
            scaler.transform(&other),
            Err(RestockError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/scaler.bin");
        let scaler = StandardScaler::fit(&matrix(vec![vec![1.0, 2.0], vec![3.0, 7.0]])).unwrap();
        scaler.save(&path).unwrap();
        assert_eq!(StandardScaler::load(&path).unwrap(), scaler);

        let missing = StandardScaler::load(dir.path().join("nope.bin"));
        assert!(matches!(missing, Err(RestockError::NotFound(_))));
    }
}
