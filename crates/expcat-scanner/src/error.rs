use std::path::PathBuf;

use thiserror::Error;

/// Result type for expcat-scanner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while scanning
#[derive(Debug, Error)]
pub enum Error {
    /// File could not be opened or its metadata could not be extracted
    #[error("unreadable file {}: {reason}", .path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    /// Experiment metadata.yaml exists but is not valid YAML
    #[error("invalid experiment metadata {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Directory traversal failed
    #[error("directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Path of the file the error concerns, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::UnreadableFile { path, .. } | Error::Metadata { path, .. } => Some(path),
            Error::WalkDir(err) => err.path(),
            Error::Io(_) => None,
        }
    }
}
