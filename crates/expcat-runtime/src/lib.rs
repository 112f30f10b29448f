// Runtime layer
// Index building, read-only query sessions and variable loading on top of
// the scanner, the catalog store and the loading engine

pub mod config;
mod error;
mod loader;
pub mod ops;
mod session;

pub use config::{Config, IndexDefaults, resolve_db_path};
pub use error::{Error, Result};
pub use loader::getvar;
pub use ops::{FileFailure, IndexOptions, IndexProgress, IndexReport, IndexService, build_index};
pub use session::Session;

pub use expcat_engine::{DataArray, GetVarOptions, LazyArray};
