//! Classification metrics and their text rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::Label;
use crate::error::{RestockError, Result};

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn check_lengths(y_true: &[Label], y_pred: &[Label]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(RestockError::invalid_argument(format!(
            "{} true labels for {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

/// Sorted union of the labels present in either vector.
fn labels_of(y_true: &[Label], y_pred: &[Label]) -> Vec<Label> {
    let mut labels: Vec<Label> = y_true.iter().chain(y_pred).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Counts of actual (rows) versus predicted (columns) labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class labels, ascending; indexes both rows and columns.
    pub labels: Vec<Label>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let labels = labels_of(y_true, y_pred);
        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            // Both labels are in `labels` by construction.
            let row = labels.binary_search(t).unwrap_or_default();
            let col = labels.binary_search(p).unwrap_or_default();
            counts[row][col] += 1;
        }
        Ok(Self { labels, counts })
    }

    /// Correct predictions for the class at `idx`.
    fn true_positives(&self, idx: usize) -> usize {
        self.counts[idx][idx]
    }

    /// Rows whose actual label is the class at `idx`.
    fn support(&self, idx: usize) -> usize {
        self.counts[idx].iter().sum()
    }

    /// Rows predicted as the class at `idx`.
    fn predicted(&self, idx: usize) -> usize {
        self.counts.iter().map(|row| row[idx]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    /// Bracketed grid, one row per actual label.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);
        for (i, row) in self.counts.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
            let open = if i == 0 { "[[" } else { " [" };
            let close = if i + 1 == self.counts.len() { "]]" } else { "]\n" };
            write!(f, "{open}{}{close}", cells.join(" "))?;
        }
        if self.counts.is_empty() {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics with accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: usize,
}

impl ClassificationReport {
    /// Build the report. A metric whose denominator is zero is `0.0`.
    pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        let matrix = ConfusionMatrix::new(y_true, y_pred)?;
        Ok(Self::from_confusion(&matrix))
    }

    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = matrix
            .labels
            .iter()
            .enumerate()
            .map(|(idx, &label)| {
                let tp = matrix.true_positives(idx) as f64;
                let precision = ratio(tp, matrix.predicted(idx) as f64);
                let recall = ratio(tp, matrix.support(idx) as f64);
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support: matrix.support(idx),
                }
            })
            .collect();

        let total = matrix.total();
        let correct: usize = (0..matrix.labels.len()).map(|i| matrix.true_positives(i)).sum();
        let n_classes = classes.len().max(1) as f64;
        let macro_avg = average(&classes, |_| 1.0 / n_classes, total);
        let weighted_avg = average(
            &classes,
            |c| ratio(c.support as f64, total as f64),
            total,
        );

        Self {
            classes,
            accuracy: ratio(correct as f64, total as f64),
            macro_avg,
            weighted_avg,
            total,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

fn average<F: Fn(&ClassMetrics) -> f64>(classes: &[ClassMetrics], weight: F, total: usize) -> ClassMetrics {
    let mut avg = ClassMetrics {
        label: 0,
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        support: total,
    };
    for class in classes {
        let w = weight(class);
        avg.precision += w * class.precision;
        avg.recall += w * class.recall;
        avg.f1 += w * class.f1;
    }
    avg
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.to_string().len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            write_row(f, &class.label.to_string(), class, width)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        write_row(f, "macro avg", &self.macro_avg, width)?;
        write_row(f, "weighted avg", &self.weighted_avg, width)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics, width: usize) -> fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1, m.support
    )
}

/// Everything the trainer reports about a fitted model on held-out data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl Evaluation {
    pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        let confusion = ConfusionMatrix::new(y_true, y_pred)?;
        let report = ClassificationReport::from_confusion(&confusion);
        Ok(Self {
            accuracy: report.accuracy,
            confusion,
            report,
        })
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Accuracy: {:.2}%", self.accuracy * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        let labels: Vec<String> = self.confusion.labels.iter().map(|l| l.to_string()).collect();
        writeln!(f, "(rows: actual, columns: predicted; labels {})", labels.join(", "))?;
        writeln!(f, "{}", self.confusion)?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{}", self.report)
    }
}
