//! # Restock
//!
//! A three-stage pipeline predicting which supplies need restocking.
//!
//! ## Stages
//!
//! - `prepare`: load the raw CSV, fill missing values, one-hot encode the
//!   categorical columns and persist a seeded train/test split
//! - `train`: standardize the features, fit a random forest (optionally
//!   through a cross-validated grid search) and evaluate it
//! - `report`: predict on the test split and write the actionable restock list
//!
//! Stages share nothing but files on disk; see [`pipeline`].

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;

pub use error::{RestockError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
