use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A file selected for loading could not be opened or read
    #[error("{}: {source}", .path.display())]
    Netcdf {
        path: PathBuf,
        source: expcat_netcdf::Error,
    },

    /// A later file disagrees with the first file of the concatenation
    #[error("cannot concatenate {}: {reason}", .path.display())]
    IncompatibleFile { path: PathBuf, reason: String },

    /// The requested time window selects no time steps
    #[error("no time steps of '{variable}' fall within {window}")]
    EmptyRange { variable: String, window: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Time axis values could not be decoded
    #[error("time axis of {}: {source}", .path.display())]
    Time {
        path: PathBuf,
        source: expcat_types::Error,
    },

    #[error("chunk {index:?} is outside a grid of {grid:?} chunks")]
    ChunkOutOfRange { index: Vec<usize>, grid: Vec<usize> },

    #[error("slab {requested:?} is outside a leading extent of {extent}")]
    SlabOutOfRange {
        requested: Range<usize>,
        extent: usize,
    },

    #[error("array shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    pub(crate) fn netcdf(path: impl Into<PathBuf>) -> impl FnOnce(expcat_netcdf::Error) -> Error {
        let path = path.into();
        move |source| Error::Netcdf { path, source }
    }

    pub(crate) fn time(path: impl Into<PathBuf>) -> impl FnOnce(expcat_types::Error) -> Error {
        let path = path.into();
        move |source| Error::Time { path, source }
    }
}
