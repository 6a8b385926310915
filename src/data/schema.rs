//! The feature schema shared by all stages.
//!
//! The schema is written next to the split data by the preparation stage and
//! checked by every later stage before any row is used, so that a column
//! layout drift surfaces as `SchemaMismatch` instead of silently misaligned
//! predictions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::encoder::{CategoryColumn, OneHotEncoder};
use crate::data::frame::FeatureMatrix;
use crate::error::{RestockError, Result};

/// File name of the persisted schema.
pub const SCHEMA_FILE: &str = "feature_schema.json";

/// Ordered feature layout plus the encoder that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Feature columns in matrix order.
    pub columns: Vec<String>,
    /// Numeric pass-through columns, in input order.
    pub numeric_columns: Vec<String>,
    /// Label column name.
    pub label_column: String,
    /// Fitted categories of each encoded column.
    pub encoder: OneHotEncoder,
}

impl FeatureSchema {
    /// Build the schema for numeric columns followed by the encoder output.
    pub fn new(numeric_columns: Vec<String>, label_column: String, encoder: OneHotEncoder) -> Self {
        let mut columns = numeric_columns.clone();
        columns.extend(encoder.output_columns());
        Self {
            columns,
            numeric_columns,
            label_column,
            encoder,
        }
    }

    /// Recorded categories of a source column.
    pub fn category(&self, name: &str) -> Option<&CategoryColumn> {
        self.encoder.column(name)
    }

    /// Check a matrix against this schema.
    pub fn validate(&self, matrix: &FeatureMatrix, context: &str) -> Result<()> {
        matrix.ensure_columns(&self.columns, context)
    }

    /// Write the schema as JSON into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let path = dir.as_ref().join(SCHEMA_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read the schema from `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(SCHEMA_FILE);
        if !path.exists() {
            return Err(RestockError::missing_artifact(&path));
        }
        let content = fs::read_to_string(&path)?;
        let schema: FeatureSchema = serde_json::from_str(&content)?;

        let mut expected = schema.numeric_columns.clone();
        expected.extend(schema.encoder.output_columns());
        if expected != schema.columns {
            return Err(RestockError::schema_mismatch(format!(
                "{} lists columns inconsistent with its encoder",
                path.display()
            )));
        }
        Ok(schema)
    }
}
