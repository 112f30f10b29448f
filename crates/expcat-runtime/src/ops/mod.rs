pub mod index;

pub use index::{FileFailure, IndexOptions, IndexProgress, IndexReport, IndexService, build_index};
