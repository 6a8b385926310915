//! Missing-value filling, one-hot encoding and label extraction.

use log::{debug, info};

use crate::data::Label;
use crate::data::encoder::OneHotEncoder;
use crate::data::frame::{Cell, FeatureMatrix, RawTable};
use crate::data::schema::FeatureSchema;
use crate::error::{RestockError, Result};

/// Category substituted for a missing categorical value.
pub const MISSING_CATEGORY: &str = "0";

/// Output of [`Preprocessor::preprocess`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub features: FeatureMatrix,
    pub labels: Vec<Label>,
    pub schema: FeatureSchema,
}

/// Turns a raw table into a numeric feature matrix and a label vector.
///
/// Missing values are replaced with zero: `0.0` for numeric cells, the
/// category `"0"` for categorical cells and label `0`. This is a fixed policy,
/// not an imputation estimated from the data.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    categorical_columns: Vec<String>,
    label_column: String,
}

/// Column positions resolved against one raw table.
struct Layout {
    label: usize,
    categorical: Vec<usize>,
    numeric: Vec<usize>,
}

impl Preprocessor {
    pub fn new(categorical_columns: Vec<String>, label_column: impl Into<String>) -> Self {
        Self {
            categorical_columns,
            label_column: label_column.into(),
        }
    }

    /// Fit the encoder on `raw` and encode it.
    pub fn preprocess(&self, raw: &RawTable) -> Result<Preprocessed> {
        let layout = self.layout(raw)?;

        let categorical_values: Vec<Vec<String>> = layout
            .categorical
            .iter()
            .map(|&idx| {
                raw.rows()
                    .iter()
                    .map(|row| category_of(&row[idx]))
                    .collect()
            })
            .collect();
        let encoder = OneHotEncoder::fit(&self.categorical_columns, &categorical_values)?;

        let numeric_columns = layout
            .numeric
            .iter()
            .map(|&idx| raw.columns()[idx].clone())
            .collect();
        let schema = FeatureSchema::new(numeric_columns, self.label_column.clone(), encoder);

        let (features, labels) = self.encode(raw, &layout, &schema)?;
        info!(
            "Preprocessed {} rows into {} feature columns ({} missing cells filled with 0)",
            features.num_rows(),
            features.num_columns(),
            raw.missing_count()
        );
        for column in schema.encoder.columns() {
            debug!(
                "{}: {} categories, reference '{}'",
                column.name,
                column.categories.len(),
                column.reference()
            );
        }

        Ok(Preprocessed {
            features,
            labels,
            schema,
        })
    }

    /// Encode `raw` with an already fitted schema.
    ///
    /// The raw table must carry the schema's numeric columns; categories are
    /// taken from the schema, never from `raw`.
    pub fn transform(&self, raw: &RawTable, schema: &FeatureSchema) -> Result<(FeatureMatrix, Vec<Label>)> {
        let layout = self.layout(raw)?;
        let numeric: Vec<&String> = layout.numeric.iter().map(|&i| &raw.columns()[i]).collect();
        if numeric.len() != schema.numeric_columns.len()
            || numeric.iter().zip(&schema.numeric_columns).any(|(a, b)| *a != b)
        {
            return Err(RestockError::schema_mismatch(format!(
                "numeric columns {:?} do not match fitted columns {:?}",
                numeric, schema.numeric_columns
            )));
        }
        self.encode(raw, &layout, schema)
    }

    fn layout(&self, raw: &RawTable) -> Result<Layout> {
        let label = raw.require_column(&self.label_column)?;
        let categorical = self
            .categorical_columns
            .iter()
            .map(|name| raw.require_column(name))
            .collect::<Result<Vec<_>>>()?;
        let numeric = (0..raw.columns().len())
            .filter(|idx| *idx != label && !categorical.contains(idx))
            .collect();
        Ok(Layout {
            label,
            categorical,
            numeric,
        })
    }

    fn encode(
        &self,
        raw: &RawTable,
        layout: &Layout,
        schema: &FeatureSchema,
    ) -> Result<(FeatureMatrix, Vec<Label>)> {
        let mut rows = Vec::with_capacity(raw.num_rows());
        let mut labels = Vec::with_capacity(raw.num_rows());

        for (row_idx, row) in raw.rows().iter().enumerate() {
            let mut values = Vec::with_capacity(schema.columns.len());
            for &idx in &layout.numeric {
                values.push(numeric_of(&row[idx]).ok_or_else(|| {
                    RestockError::parse(format!(
                        "row {}: column '{}' is not numeric",
                        row_idx + 1,
                        raw.columns()[idx]
                    ))
                })?);
            }

            let categories: Vec<String> =
                layout.categorical.iter().map(|&idx| category_of(&row[idx])).collect();
            values.extend(schema.encoder.transform_row(&categories)?);
            rows.push(values);

            labels.push(label_of(&row[layout.label]).ok_or_else(|| {
                RestockError::parse(format!(
                    "row {}: label '{}' must be an integer",
                    row_idx + 1,
                    self.label_column
                ))
            })?);
        }

        Ok((FeatureMatrix::new(schema.columns.clone(), rows)?, labels))
    }
}

fn category_of(cell: &Cell) -> String {
    cell.as_category()
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

fn numeric_of(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Missing => Some(0.0),
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(1.0),
            "false" => Some(0.0),
            _ => None,
        },
    }
}

fn label_of(cell: &Cell) -> Option<Label> {
    match cell {
        Cell::Missing => Some(0),
        Cell::Number(n) if n.fract() == 0.0 => Some(*n as Label),
        Cell::Number(_) => None,
        Cell::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(1),
            "false" => Some(0),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> RawTable {
        let columns = ["Region", "Stock", "Supply_Category", "Month", "Restock_Flag"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|v| Cell::parse(v)).collect())
            .collect();
        RawTable::new(columns, rows).unwrap()
    }

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(
            vec![
                "Region".to_string(),
                "Supply_Category".to_string(),
                "Month".to_string(),
            ],
            "Restock_Flag",
        )
    }

    #[test]
    fn test_preprocess_layout() {
        let table = raw(&[
            &["North", "10", "Vaccines", "Jan", "1"],
            &["South", "", "Drugs", "Feb", "0"],
            &["North", "7.5", "Drugs", "Jan", ""],
        ]);
        let out = preprocessor().preprocess(&table).unwrap();

        assert_eq!(
            out.features.columns(),
            &[
                "Stock",
                "Region_South",
                "Supply_Category_Vaccines",
                "Month_Jan"
            ]
        );
        assert_eq!(out.features.rows()[0], vec![10.0, 0.0, 1.0, 1.0]);
        assert_eq!(out.features.rows()[1], vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(out.labels, vec![1, 0, 0]);
    }

    #[test]
    fn test_missing_category_becomes_zero_category() {
        let table = raw(&[
            &["North", "1", "Drugs", "Jan", "1"],
            &["", "2", "Drugs", "Jan", "0"],
        ]);
        let out = preprocessor().preprocess(&table).unwrap();
        let region = out.schema.category("Region").unwrap();
        assert_eq!(region.categories, vec!["0", "North"]);
    }

    #[test]
    fn test_deterministic() {
        let table = raw(&[
            &["North", "10", "Vaccines", "Jan", "1"],
            &["South", "3", "Drugs", "Feb", "0"],
        ]);
        let a = preprocessor().preprocess(&table).unwrap();
        let b = preprocessor().preprocess(&table).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.schema, b.schema);
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let table = raw(&[&["North", "lots", "Vaccines", "Jan", "1"]]);
        let result = preprocessor().preprocess(&table);
        assert!(matches!(result, Err(RestockError::Parse(_))));
    }

    #[test]
    fn test_fractional_label_rejected() {
        let table = raw(&[&["North", "1", "Vaccines", "Jan", "0.5"]]);
        assert!(matches!(
            preprocessor().preprocess(&table),
            Err(RestockError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let table = RawTable::new(
            vec!["Region".to_string(), "Restock_Flag".to_string()],
            vec![vec![Cell::parse("North"), Cell::parse("1")]],
        )
        .unwrap();
        assert!(matches!(
            preprocessor().preprocess(&table),
            Err(RestockError::Parse(_))
        ));
    }

    #[test]
    fn test_transform_reuses_fitted_categories() {
        let train = raw(&[
            &["North", "10", "Vaccines", "Jan", "1"],
            &["South", "3", "Drugs", "Feb", "0"],
            &["West", "3", "Drugs", "Mar", "0"],
        ]);
        let fitted = preprocessor().preprocess(&train).unwrap();

        // A later load that only contains one region still gets every column.
        let later = raw(&[&["South", "4", "Drugs", "Mar", "1"]]);
        let (features, labels) = preprocessor().transform(&later, &fitted.schema).unwrap();
        assert_eq!(features.columns(), fitted.features.columns());
        assert_eq!(features.rows()[0], vec![4.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(labels, vec![1]);
    }
}
