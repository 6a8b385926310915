//! Logger setup for the pipeline binaries.
//!
//! Logging goes through the `log` facade. The binary builds the backend once
//! from a [`LoggingConfig`]; library code never installs a logger itself.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use env_logger::{Builder, Target};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{RestockError, Result};

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    Stderr,
    Stdout,
    /// Append to a file, creating it and its parent directory if needed.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name: off, error, warn, info, debug or trace.
    pub level: String,
    pub destination: LogDestination,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            destination: LogDestination::Stderr,
        }
    }
}

impl LoggingConfig {
    /// Parsed level filter.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| RestockError::invalid_config(format!("unknown log level '{}'", self.level)))
    }

    /// Map a CLI verbosity count onto a level, keeping the configured level
    /// for the default verbosity.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Some("error"),
            1 => None,
            2 => Some("info"),
            _ => Some("debug"),
        };
        if let Some(level) = level {
            self.level = level.to_string();
        }
        self
    }
}

/// Install the global logger described by `config`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(config.level_filter()?).format(|buf, record| {
        writeln!(
            buf,
            "{}:{}:{}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    match &config.destination {
        LogDestination::Stderr => {
            builder.target(Target::Stderr);
        }
        LogDestination::Stdout => {
            builder.target(Target::Stdout);
        }
        LogDestination::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(Target::Pipe(Box::new(file)));
        }
    }

    builder
        .try_init()
        .map_err(|e| RestockError::other(format!("failed to install logger: {e}")))
}
