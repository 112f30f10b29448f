//! Error types for netCDF access.

use thiserror::Error;

/// Result type for netCDF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for netCDF access.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Magic bytes do not identify any netCDF flavour
    #[error("not a netCDF file: {0}")]
    NotNetcdf(String),

    /// Recognised container this build cannot read
    #[error("unsupported netCDF format: {0}")]
    UnsupportedFormat(String),

    /// Header or data section is truncated or inconsistent
    #[error("malformed netCDF file: {0}")]
    Malformed(String),

    /// Requested variable is not in the file
    #[error("variable '{0}' not found")]
    MissingVariable(String),

    /// Variable holds characters, not numbers
    #[error("variable '{0}' is not numeric")]
    NotNumeric(String),

    /// Requested slab lies outside the variable's extent
    #[error("slab {requested:?} outside '{variable}' extent of {extent}")]
    OutOfBounds {
        variable: String,
        requested: std::ops::Range<usize>,
        extent: usize,
    },

    /// Builder was given inconsistent definitions
    #[error("cannot write netCDF file: {0}")]
    Write(String),
}
