use std::path::PathBuf;

use expcat_types::Frequency;
use thiserror::Error;

/// Result type for expcat-index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the catalog layer
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed
    #[error("{}", database_message(.0))]
    Database(#[from] rusqlite::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON column could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog file is missing, unreadable or from another schema version
    #[error("catalog unavailable at {}: {reason}", .path.display())]
    StoreUnavailable { path: PathBuf, reason: String },

    /// No experiment with this name has been indexed
    #[error("experiment '{0}' not found in catalog")]
    ExperimentNotFound(String),

    /// No file of the experiment contains the variable (at the frequency)
    #[error(
        "variable '{variable}' not found in experiment '{experiment}'{}",
        .frequency.as_ref().map(|f| format!(" at frequency '{}'", f)).unwrap_or_default()
    )]
    VariableNotFound {
        experiment: String,
        variable: String,
        frequency: Option<Frequency>,
    },

    /// Variable exists at several frequencies and none was requested
    #[error(
        "variable '{variable}' in experiment '{experiment}' has several frequencies ({}); choose one",
        join(.frequencies)
    )]
    AmbiguousFrequency {
        experiment: String,
        variable: String,
        frequencies: Vec<Frequency>,
    },

    /// File's time coverage overlaps an already catalogued file
    #[error(
        "{path}: '{variable}' ({frequency}) overlaps time coverage of {existing} in experiment '{experiment}'"
    )]
    OverlappingCoverage {
        experiment: String,
        variable: String,
        frequency: Frequency,
        path: String,
        existing: String,
    },

    /// Experiment name already catalogued under another directory
    #[error("experiment '{experiment}' already catalogued at {existing_root}, found again at {new_root}")]
    ExperimentConflict {
        experiment: String,
        existing_root: String,
        new_root: String,
    },

    /// Stored value could not be parsed back into a domain type
    #[error("corrupt catalog value: {0}")]
    Corrupt(String),
}

impl Error {
    /// Whether the error concerns one file and leaves the catalog usable.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Error::OverlappingCoverage { .. } | Error::ExperimentConflict { .. }
        )
    }
}

fn database_message(err: &rusqlite::Error) -> String {
    let msg = err.to_string();
    // Stale catalogs from older builds surface as missing columns/tables
    if msg.contains("no such column") || msg.contains("no such table") {
        format!(
            "Catalog schema mismatch: {}. Re-run `expcat index` to rebuild it.",
            msg
        )
    } else {
        format!("Database error: {}", err)
    }
}

fn join(frequencies: &[Frequency]) -> String {
    frequencies
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
