//! CSV persistence of the split data.
//!
//! A data directory holds four CSV files and the feature schema:
//!
//! ```text
//! dataset/
//!   X_train.csv  X_test.csv  y_train.csv  y_test.csv  feature_schema.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer};
use log::{error, info};

use crate::data::Label;
use crate::data::frame::FeatureMatrix;
use crate::data::schema::{FeatureSchema, SCHEMA_FILE};
use crate::data::split::PartitionSet;
use crate::error::{RestockError, Result};

pub const X_TRAIN_FILE: &str = "X_train.csv";
pub const X_TEST_FILE: &str = "X_test.csv";
pub const Y_TRAIN_FILE: &str = "y_train.csv";
pub const Y_TEST_FILE: &str = "y_test.csv";

/// Paths of the artifacts inside one data directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub x_train: PathBuf,
    pub x_test: PathBuf,
    pub y_train: PathBuf,
    pub y_test: PathBuf,
    pub schema: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            x_train: dir.join(X_TRAIN_FILE),
            x_test: dir.join(X_TEST_FILE),
            y_train: dir.join(Y_TRAIN_FILE),
            y_test: dir.join(Y_TEST_FILE),
            schema: dir.join(SCHEMA_FILE),
        }
    }

    /// The four split files, in load order.
    fn data_files(&self) -> [&PathBuf; 4] {
        [&self.x_train, &self.x_test, &self.y_train, &self.y_test]
    }
}

/// Write the partitions and schema under `dir`, creating it if absent.
/// Files from a previous run are overwritten.
pub fn persist<P: AsRef<Path>>(parts: &PartitionSet, schema: &FeatureSchema, dir: P) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let paths = ArtifactPaths::new(dir);

    schema.validate(&parts.x_train, X_TRAIN_FILE)?;
    schema.validate(&parts.x_test, X_TEST_FILE)?;

    write_features(&paths.x_train, &parts.x_train)?;
    write_features(&paths.x_test, &parts.x_test)?;
    write_labels(&paths.y_train, &schema.label_column, &parts.y_train)?;
    write_labels(&paths.y_test, &schema.label_column, &parts.y_test)?;
    schema.save(dir)?;

    info!(
        "Persisted {} training and {} test rows to {}",
        parts.x_train.num_rows(),
        parts.x_test.num_rows(),
        dir.display()
    );
    Ok(())
}

/// Load the partitions written by [`persist`].
///
/// Fails with `MissingArtifact` if any file is absent and with
/// `SchemaMismatch` if a feature header differs from the schema or a feature
/// file and its label file disagree on row count.
pub fn load_persisted<P: AsRef<Path>>(dir: P) -> Result<(PartitionSet, FeatureSchema)> {
    let paths = ArtifactPaths::new(dir.as_ref());
    if let Some(missing) = paths.data_files().into_iter().find(|p| !p.exists()) {
        error!("Training artifact missing: {}", missing.display());
        return Err(RestockError::missing_artifact(missing));
    }
    let schema = FeatureSchema::load(dir.as_ref())?;

    let x_train = read_features(&paths.x_train)?;
    let x_test = read_features(&paths.x_test)?;
    schema.validate(&x_train, X_TRAIN_FILE)?;
    schema.validate(&x_test, X_TEST_FILE)?;

    let y_train = read_labels(&paths.y_train)?;
    let y_test = read_labels(&paths.y_test)?;
    ensure_same_length(&x_train, &y_train, X_TRAIN_FILE)?;
    ensure_same_length(&x_test, &y_test, X_TEST_FILE)?;

    info!(
        "Loaded preprocessed data: {} training rows, {} test rows, {} features",
        x_train.num_rows(),
        x_test.num_rows(),
        x_train.num_columns()
    );

    Ok((
        PartitionSet {
            x_train,
            x_test,
            y_train,
            y_test,
        },
        schema,
    ))
}

/// Load only the test partition, failing with `NotFound` for any absent file.
pub fn load_test_data<P: AsRef<Path>>(dir: P) -> Result<(FeatureMatrix, Vec<Label>, FeatureSchema)> {
    let paths = ArtifactPaths::new(dir.as_ref());
    for path in [&paths.x_test, &paths.y_test, &paths.schema] {
        if !path.exists() {
            error!("Test dataset not found: {}", path.display());
            return Err(RestockError::not_found(path));
        }
    }

    let schema = FeatureSchema::load(dir.as_ref())?;
    let x_test = read_features(&paths.x_test)?;
    schema.validate(&x_test, X_TEST_FILE)?;
    let y_test = read_labels(&paths.y_test)?;
    ensure_same_length(&x_test, &y_test, X_TEST_FILE)?;

    info!(
        "Test data loaded successfully from {} and {}",
        paths.x_test.display(),
        paths.y_test.display()
    );
    Ok((x_test, y_test, schema))
}

fn ensure_same_length(features: &FeatureMatrix, labels: &[Label], context: &str) -> Result<()> {
    if features.num_rows() != labels.len() {
        return Err(RestockError::schema_mismatch(format!(
            "{context}: {} feature rows but {} labels",
            features.num_rows(),
            labels.len()
        )));
    }
    Ok(())
}

/// Write a feature matrix with its header.
pub fn write_features(path: &Path, matrix: &FeatureMatrix) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(matrix.columns())?;
    for row in matrix.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a feature matrix written by [`write_features`].
pub fn read_features(path: &Path) -> Result<FeatureMatrix> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| RestockError::parse(format!("{}: record {}: {e}", path.display(), line + 1)))?;
        let row = record
            .iter()
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    RestockError::parse(format!(
                        "{}: record {}: '{v}' is not a number",
                        path.display(),
                        line + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    FeatureMatrix::new(columns, rows)
}

fn write_labels(path: &Path, header: &str, labels: &[Label]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([header])?;
    for label in labels {
        writer.write_record([label.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn read_labels(path: &Path) -> Result<Vec<Label>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    if reader.headers()?.len() != 1 {
        return Err(RestockError::parse(format!(
            "{} must hold exactly one column",
            path.display()
        )));
    }

    let mut labels = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let value = record.get(0).unwrap_or_default().trim();
        let label = value.parse::<Label>().map_err(|_| {
            RestockError::parse(format!(
                "{}: record {}: '{value}' is not an integer label",
                path.display(),
                line + 1
            ))
        })?;
        labels.push(label);
    }
    Ok(labels)
}
