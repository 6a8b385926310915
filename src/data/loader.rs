//! Delimited file loading.

use std::path::Path;

use csv::ReaderBuilder;
use log::{error, info};

use crate::data::frame::{Cell, RawTable};
use crate::error::{RestockError, Result};

/// Reads raw tables from delimited files.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    /// Field delimiter (default: ',')
    delimiter: u8,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvLoader {
    /// Create a loader with comma delimiter.
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set a custom delimiter character. Only single-byte ASCII delimiters
    /// are accepted.
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self> {
        self.delimiter = u8::try_from(u32::from(delimiter))
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                RestockError::invalid_argument(format!("delimiter {delimiter:?} is not ASCII"))
            })?;
        Ok(self)
    }

    /// Read `path` into a raw table.
    ///
    /// Fails with `NotFound` when the file does not exist, `EmptyDataset` when
    /// it holds no data rows, and `Parse` for malformed content.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<RawTable> {
        let path = path.as_ref();
        match self.read(path) {
            Ok(table) => {
                info!(
                    "Data loaded successfully from {} ({} rows, {} columns)",
                    path.display(),
                    table.num_rows(),
                    table.columns().len()
                );
                Ok(table)
            }
            Err(e) => {
                error!("Error loading data: {e}");
                Err(e)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<RawTable> {
        if !path.exists() {
            return Err(RestockError::not_found(path));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader
            .headers()
            .map_err(|e| RestockError::parse(format!("failed to read header: {e}")))?
            .clone();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(RestockError::parse(format!(
                "{} has no header",
                path.display()
            )));
        }

        let columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        if let Some(dup) = columns
            .iter()
            .enumerate()
            .find(|(i, c)| columns[..*i].contains(c))
            .map(|(_, c)| c)
        {
            return Err(RestockError::parse(format!("duplicate column '{dup}'")));
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                RestockError::parse(format!("malformed record {}: {e}", line + 1))
            })?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        if rows.is_empty() {
            return Err(RestockError::empty_dataset(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        RawTable::new(columns, rows)
    }
}

/// Load a comma-delimited file with the default loader.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    CsvLoader::new().load(path)
}
