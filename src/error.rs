//! Error types for the Restock pipeline.
//!
//! All fallible operations in the crate return [`Result`], whose error type is
//! the [`RestockError`] enum. Loading failures are fatal to the running stage:
//! they are logged once and propagated to the binary, which exits non-zero.
//!
//! # Examples
//!
//! ```
//! use restock::error::{RestockError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RestockError::invalid_argument("test_fraction must be in (0, 1)"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;
use std::path::Path;

use thiserror::Error;

/// The main error type for Restock operations.
#[derive(Error, Debug)]
pub enum RestockError {
    /// An input file or persisted artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The input file contained a header but no data rows.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Malformed tabular content.
    #[error("Parse error: {0}")]
    Parse(String),

    /// One of the expected training artifacts is absent.
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    /// Encoded column sets differ between two stages.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid argument or configuration value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A model was used before being fitted.
    #[error("Model not trained: {0}")]
    ModelNotTrained(String),

    /// Binary (de)serialization of a model or scaler failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with RestockError.
pub type Result<T> = std::result::Result<T, RestockError>;

impl RestockError {
    /// Create a not found error for a path.
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        RestockError::NotFound(path.as_ref().display().to_string())
    }

    /// Create a new empty dataset error.
    pub fn empty_dataset<S: Into<String>>(msg: S) -> Self {
        RestockError::EmptyDataset(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        RestockError::Parse(msg.into())
    }

    /// Create a missing artifact error for a path.
    pub fn missing_artifact<P: AsRef<Path>>(path: P) -> Self {
        RestockError::MissingArtifact(path.as_ref().display().to_string())
    }

    /// Create a new schema mismatch error.
    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        RestockError::SchemaMismatch(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RestockError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        RestockError::InvalidArgument(format!("configuration: {}", msg.into()))
    }

    /// Create a new model not trained error.
    pub fn not_trained<S: Into<String>>(msg: S) -> Self {
        RestockError::ModelNotTrained(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        RestockError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RestockError::Other(msg.into())
    }
}

impl From<bincode::Error> for RestockError {
    fn from(err: bincode::Error) -> Self {
        RestockError::Serialization(err.to_string())
    }
}
