// File scanner
// Walks configuration/experiment/output_dir/*.nc and extracts catalog
// metadata from file headers

pub mod cf;
mod error;
pub mod frequency;
pub mod layout;
pub mod metadata;
mod scan;

pub use cf::{TimeAxis, find_time_axis};
pub use error::{Error, Result};
pub use frequency::detect_frequency;
pub use layout::{CandidateIter, FileCandidate, candidates, current_mod_time, format_mod_time};
pub use metadata::read_experiment_metadata;
pub use scan::{ScanIter, ScannedFile, Scanner, scan_file};
