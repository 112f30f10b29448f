use serde::{Deserialize, Serialize};

use crate::calendar::{Calendar, CalendarDate};
use crate::frequency::Frequency;

/// Inclusive span between the first and last timestamp of a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCoverage {
    pub start: CalendarDate,
    pub end: CalendarDate,
}

impl TimeCoverage {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Self {
        Self { start, end }
    }

    /// Timestamps are points, so touching spans (end == start) overlap.
    pub fn overlaps(&self, other: &TimeCoverage) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, date: &CalendarDate) -> bool {
        self.start <= *date && *date <= self.end
    }

    /// Smallest coverage containing both spans.
    pub fn union(&self, other: &TimeCoverage) -> TimeCoverage {
        TimeCoverage {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Descriptive fields read from an experiment's `metadata.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// Identity of an experiment as discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRef {
    pub name: String,
    pub configuration: String,
    /// Absolute path of the experiment directory.
    pub root_dir: String,
    #[serde(default)]
    pub metadata: ExperimentMetadata,
}

/// One simulation run as listed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    pub configuration: String,
    pub root_dir: String,
    pub output_dirs: Vec<String>,
    pub file_count: usize,
    #[serde(default)]
    pub metadata: ExperimentMetadata,
}

/// One netCDF file belonging to one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcFile {
    /// Absolute path of the file.
    pub path: String,
    pub experiment: String,
    /// Output directory name (third level of the layout).
    pub output_dir: String,
    /// When the record was written to the catalog (RFC 3339).
    pub ingested_at: String,
    /// File modification time when scanned (RFC 3339, nanoseconds).
    pub mod_time: String,
    pub file_size: i64,
    pub frequency: Frequency,
    pub coverage: Option<TimeCoverage>,
    /// Raw `units` attribute of the time axis, if any.
    pub time_units: Option<String>,
    pub calendar: Option<Calendar>,
}

/// One variable within one netCDF file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    pub dimensions: Vec<String>,
    pub frequency: Frequency,
    pub coverage: Option<TimeCoverage>,
    pub units: Option<String>,
    pub long_name: Option<String>,
    pub standard_name: Option<String>,
    /// A coordinate variable, or the bounds of one. Files on the same axis
    /// all carry it, so it is exempt from the overlap check.
    #[serde(default)]
    pub coordinate: bool,
}

/// Per-(variable, frequency) rollup of an experiment's catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    pub frequency: Frequency,
    pub long_name: Option<String>,
    pub units: Option<String>,
    pub file_count: usize,
    pub coverage: Option<TimeCoverage>,
}

/// A file resolved for loading, paired with the matching variable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    pub file: NcFile,
    pub variable: VariableRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(a: i64, b: i64) -> TimeCoverage {
        TimeCoverage::new(CalendarDate::ymd(a, 1, 1), CalendarDate::ymd(b, 12, 31))
    }

    #[test]
    fn test_adjacent_years_do_not_overlap() {
        assert!(!span(1900, 1950).overlaps(&span(1951, 2000)));
        assert!(span(1900, 1951).overlaps(&span(1951, 2000)));
        assert!(span(1960, 1970).overlaps(&span(1900, 2000)));
    }

    #[test]
    fn test_union() {
        let u = span(1951, 2000).union(&span(1900, 1950));
        assert_eq!(u, span(1900, 2000));
    }

    #[test]
    fn test_metadata_yaml_shape_roundtrips_through_json() {
        let meta = ExperimentMetadata {
            contact: Some("Ocean Team".to_string()),
            keywords: vec!["jra55".to_string(), "iaf".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("email"));
        let back: ExperimentMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
