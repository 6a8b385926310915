//! In-memory tables: the raw input table and the encoded feature matrix.

use serde::{Deserialize, Serialize};

use crate::error::{RestockError, Result};

/// A single raw cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classify a raw field. Empty fields and the usual NA markers are missing.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || matches!(trimmed, "NA" | "NaN" | "nan" | "null" | "NULL") {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Number(value),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Render the cell as a category name.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

/// Render a number the way it was most likely written in the input.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Raw table as read from the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, checking every row against the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(RestockError::parse(format!(
                "row {} has {} fields, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| RestockError::parse(format!("required column '{name}' not found")))
    }

    /// Count of missing cells across the whole table.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_missing())
            .count()
    }
}

/// Numeric feature matrix with named, ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking every row against the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(idx) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(RestockError::schema_mismatch(format!(
                "row {} has {} values for {} columns",
                idx,
                rows[idx].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// New matrix holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Same columns, new values. Used by transforms that keep the layout.
    pub fn with_rows(&self, rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(self.columns.clone(), rows)
    }

    /// Fail unless `expected` lists exactly this matrix's columns, in order.
    pub fn ensure_columns(&self, expected: &[String], context: &str) -> Result<()> {
        if self.columns.as_slice() == expected {
            return Ok(());
        }
        let detail = match self
            .columns
            .iter()
            .zip(expected.iter())
            .position(|(a, b)| a != b)
        {
            Some(pos) => format!(
                "column {} is '{}', expected '{}'",
                pos, self.columns[pos], expected[pos]
            ),
            None => format!(
                "{} columns, expected {}",
                self.columns.len(),
                expected.len()
            ),
        };
        Err(RestockError::schema_mismatch(format!("{context}: {detail}")))
    }
}
