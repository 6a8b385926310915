//! One-hot encoding of categorical columns.
//!
//! The encoder is fitted once, on the load that produces the training data,
//! and records the sorted category list of every categorical column. Later
//! transforms reuse those categories, so the indicator columns never depend on
//! which rows happen to be present.

use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{RestockError, Result};

/// Categories recorded for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryColumn {
    /// Source column name.
    pub name: String,
    /// Every category seen at fit time, sorted (numerically when all of them
    /// are numbers). The first one is the
    /// reference category and has no indicator column.
    pub categories: Vec<String>,
}

impl CategoryColumn {
    /// The dropped reference category.
    pub fn reference(&self) -> &str {
        self.categories.first().map(String::as_str).unwrap_or_default()
    }

    /// Prefix shared by this column's indicator columns.
    pub fn prefix(&self) -> String {
        format!("{}_", self.name)
    }

    /// Names of the indicator columns, in output order.
    pub fn indicator_columns(&self) -> Vec<String> {
        self.categories
            .iter()
            .skip(1)
            .map(|c| format!("{}{}", self.prefix(), c))
            .collect()
    }

    /// Indicator values for one category. Unknown categories and the reference
    /// category both produce all zeros.
    pub fn encode(&self, value: &str) -> Vec<f64> {
        self.categories
            .iter()
            .skip(1)
            .map(|c| if c == value { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.categories.iter().any(|c| c == value)
    }
}

/// Fitted one-hot encoder over a fixed, ordered set of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<CategoryColumn>,
}

impl OneHotEncoder {
    /// Record the distinct values of each named column.
    ///
    /// `values[i]` holds every value of `names[i]`, one per row.
    pub fn fit(names: &[String], values: &[Vec<String>]) -> Result<Self> {
        if names.len() != values.len() {
            return Err(RestockError::invalid_argument(format!(
                "{} column names for {} value lists",
                names.len(),
                values.len()
            )));
        }

        let columns = names
            .iter()
            .zip(values.iter())
            .map(|(name, column_values)| {
                let distinct: BTreeSet<&String> = column_values.iter().collect();
                let mut categories: Vec<String> = distinct.into_iter().cloned().collect();
                sort_categories(&mut categories);
                CategoryColumn {
                    name: name.clone(),
                    categories,
                }
            })
            .collect();

        Ok(Self { columns })
    }

    /// Build an encoder from previously recorded categories.
    pub fn from_columns(columns: Vec<CategoryColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[CategoryColumn] {
        &self.columns
    }

    /// Recorded categories for a source column.
    pub fn column(&self, name: &str) -> Option<&CategoryColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All indicator column names, grouped by source column in fit order.
    pub fn output_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.indicator_columns())
            .collect()
    }

    /// Encode one row. `row[i]` is the value of the i-th fitted column.
    pub fn transform_row(&self, row: &[String]) -> Result<Vec<f64>> {
        if row.len() != self.columns.len() {
            return Err(RestockError::schema_mismatch(format!(
                "encoder expects {} categorical values, got {}",
                self.columns.len(),
                row.len()
            )));
        }

        let mut encoded = Vec::new();
        for (column, value) in self.columns.iter().zip(row.iter()) {
            if !column.contains(value) {
                warn!(
                    "category '{}' of column '{}' was not seen at fit time; encoding as reference",
                    value, column.name
                );
            }
            encoded.extend(column.encode(value));
        }
        Ok(encoded)
    }
}

/// Order categories numerically when every one parses as a number, otherwise
/// lexically, so `3, 10, 12` keeps `3` as the reference.
fn sort_categories(categories: &mut [String]) {
    let numeric: Option<Vec<f64>> = categories.iter().map(|c| c.trim().parse().ok()).collect();
    if let Some(values) = numeric {
        let mut keyed: Vec<(f64, String)> =
            values.into_iter().zip(categories.iter().cloned()).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        for (slot, (_, category)) in categories.iter_mut().zip(keyed) {
            *slot = category;
        }
    }
}

/// Recover the category of every row from the indicator columns of `column`.
///
/// `columns` are the feature column names and `rows` the matching values. Only
/// the exact indicator names recorded for `column` take part, so a numeric
/// feature that merely shares the prefix is never mistaken for a category.
/// The chosen category is the indicator holding the largest value (first on
/// ties); rows with no indicator set decode to the reference category.
pub fn decode_category(
    columns: &[String],
    rows: &[Vec<f64>],
    column: &CategoryColumn,
) -> Vec<String> {
    let group: Vec<(usize, &str)> = column
        .categories
        .iter()
        .skip(1)
        .zip(column.indicator_columns())
        .filter_map(|(category, indicator)| {
            columns
                .iter()
                .position(|name| *name == indicator)
                .map(|idx| (idx, category.as_str()))
        })
        .collect();

    rows.iter()
        .map(|row| {
            let mut best: Option<(usize, f64)> = None;
            for (pos, &(idx, _)) in group.iter().enumerate() {
                let value = row[idx];
                if best.is_none_or(|(_, best_value)| value > best_value) {
                    best = Some((pos, value));
                }
            }
            match best {
                Some((pos, value)) if value > 0.0 => group[pos].1.to_string(),
                _ => column.reference().to_string(),
            }
        })
        .collect()
}
