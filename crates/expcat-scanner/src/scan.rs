use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use expcat_netcdf::{Header, NcReader, NcType};
use expcat_types::{
    CalendarDate, ExperimentMetadata, ExperimentRef, Frequency, NcFile, TimeCoverage,
    VariableRecord,
};

use crate::cf::{TimeAxis, find_time_axis};
use crate::frequency::detect_frequency;
use crate::layout::{CandidateIter, FileCandidate, candidates};
use crate::metadata::read_experiment_metadata;
use crate::{Error, Result};

/// Metadata extracted from one file, ready for the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub experiment: ExperimentRef,
    pub file: NcFile,
    pub variables: Vec<VariableRecord>,
}

/// Extracts catalog records from netCDF files, caching experiment metadata
/// per experiment directory.
#[derive(Debug, Default)]
pub struct Scanner {
    follow_symlinks: bool,
    metadata_cache: HashMap<PathBuf, ExperimentMetadata>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Lazily scan every candidate under `root`.
    pub fn scan(self, root: &Path) -> ScanIter {
        ScanIter {
            candidates: candidates(root, self.follow_symlinks),
            scanner: self,
        }
    }

    pub fn candidates(&self, root: &Path) -> CandidateIter {
        candidates(root, self.follow_symlinks)
    }

    /// Open one candidate's header and extract its records.
    pub fn scan_candidate(&mut self, candidate: &FileCandidate) -> Result<ScannedFile> {
        let metadata = self.experiment_metadata(&candidate.experiment_dir);
        scan_file(candidate, metadata)
    }

    fn experiment_metadata(&mut self, experiment_dir: &Path) -> ExperimentMetadata {
        self.metadata_cache
            .entry(experiment_dir.to_path_buf())
            .or_insert_with(|| {
                read_experiment_metadata(experiment_dir).unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "ignoring experiment metadata");
                    ExperimentMetadata::default()
                })
            })
            .clone()
    }
}

/// Iterator of scan results for one root; per-file failures are yielded as
/// `Err` items and do not end the iteration.
pub struct ScanIter {
    scanner: Scanner,
    candidates: CandidateIter,
}

impl Iterator for ScanIter {
    type Item = Result<ScannedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = match self.candidates.next()? {
            Ok(candidate) => candidate,
            Err(err) => return Some(Err(err)),
        };
        Some(self.scanner.scan_candidate(&candidate))
    }
}

/// Extract the catalog records of one file without reading variable data
/// (only the time coordinate and, for single-step files, its bounds).
pub fn scan_file(candidate: &FileCandidate, metadata: ExperimentMetadata) -> Result<ScannedFile> {
    let path = &candidate.path;
    let mut reader = expcat_netcdf::open(path).map_err(|e| Error::unreadable(path, e))?;

    let axis = find_time_axis(reader.header()).map_err(|e| Error::unreadable(path, e))?;
    let timing = match &axis {
        Some(axis) => read_timing(reader.as_mut(), axis).map_err(|e| Error::unreadable(path, e))?,
        None => Timing::default(),
    };

    let header = reader.header();
    let bounds: HashSet<&str> = header
        .variables
        .iter()
        .filter_map(|v| v.text_attribute("bounds"))
        .chain(axis.as_ref().and_then(|a| a.bounds.as_deref()))
        .collect();
    let variables = header
        .variables
        .iter()
        .filter(|v| v.nc_type != NcType::Char)
        .map(|v| {
            let dimensions = header.dimension_names(v);
            let on_time = axis
                .as_ref()
                .is_some_and(|a| dimensions.first() == Some(&a.dimension));
            VariableRecord {
                name: v.name.clone(),
                frequency: if on_time {
                    timing.frequency
                } else {
                    Frequency::Static
                },
                coverage: if on_time { timing.coverage } else { None },
                units: v.text_attribute("units").map(str::to_string),
                long_name: v.text_attribute("long_name").map(str::to_string),
                standard_name: v.text_attribute("standard_name").map(str::to_string),
                coordinate: dimensions.contains(&v.name) || bounds.contains(v.name.as_str()),
                dimensions,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        path = %path.display(),
        variables = variables.len(),
        frequency = %timing.frequency,
        "scanned file"
    );

    Ok(ScannedFile {
        experiment: ExperimentRef {
            name: candidate.experiment.clone(),
            configuration: candidate.configuration.clone(),
            root_dir: candidate.experiment_dir.to_string_lossy().into_owned(),
            metadata,
        },
        file: NcFile {
            path: candidate.path_str(),
            experiment: candidate.experiment.clone(),
            output_dir: candidate.output_dir.clone(),
            ingested_at: chrono::Utc::now().to_rfc3339(),
            mod_time: candidate.mod_time.clone(),
            file_size: candidate.file_size,
            frequency: timing.frequency,
            coverage: timing.coverage,
            time_units: axis.as_ref().map(|a| a.units_attr.clone()),
            calendar: axis.as_ref().map(|a| a.calendar),
        },
        variables,
    })
}

#[derive(Debug, Default)]
struct Timing {
    frequency: Frequency,
    coverage: Option<TimeCoverage>,
}

fn read_timing(reader: &mut dyn NcReader, axis: &TimeAxis) -> std::result::Result<Timing, String> {
    let raw = reader.read_all(&axis.variable).map_err(|e| e.to_string())?;
    let dates = decode_all(&raw, axis)?;

    let bounds = match (&axis.bounds, dates.len()) {
        (Some(bounds_var), 1) => read_bounds(reader, bounds_var, axis)?,
        _ => None,
    };

    let coverage = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => Some(TimeCoverage::new(*first, *last)),
        _ => None,
    };
    if let Some(c) = &coverage
        && c.start > c.end
    {
        return Err(format!("time axis '{}' is not increasing", axis.variable));
    }

    Ok(Timing {
        frequency: detect_frequency(&dates, axis.calendar, bounds),
        coverage,
    })
}

fn decode_all(raw: &[f64], axis: &TimeAxis) -> std::result::Result<Vec<CalendarDate>, String> {
    raw.iter()
        .map(|v| axis.units.decode(*v, axis.calendar).map_err(|e| e.to_string()))
        .collect()
}

fn read_bounds(
    reader: &mut dyn NcReader,
    bounds_var: &str,
    axis: &TimeAxis,
) -> std::result::Result<Option<(CalendarDate, CalendarDate)>, String> {
    let header: &Header = reader.header();
    let var = header.require_variable(bounds_var).map_err(|e| e.to_string())?;
    if header.shape(var).last() != Some(&2) {
        return Ok(None);
    }
    let values = reader
        .read_slab(bounds_var, 0..1)
        .map_err(|e| e.to_string())?;
    match decode_all(&values, axis)?.as_slice() {
        [lo, hi] => Ok(Some((*lo, *hi))),
        _ => Ok(None),
    }
}
