use thiserror::Error;

/// Result type for expcat-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug, Error)]
pub enum Error {
    /// Catalog store error (including unknown experiments and variables)
    #[error(transparent)]
    Index(#[from] expcat_index::Error),

    /// Scanner error outside any single file
    #[error(transparent)]
    Scanner(#[from] expcat_scanner::Error),

    /// Variable loading error
    #[error(transparent)]
    Engine(#[from] expcat_engine::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
