// SQLite experiment catalog
// One row per variable per file; netCDF files stay the source of truth

mod db;
mod error;
mod queries;
mod records;
mod schema;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use records::{CatalogCounts, FileState, UpsertOutcome};
pub use schema::SCHEMA_VERSION;
