use std::str::FromStr;

use expcat_types::{CalendarDate, TimeCoverage};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

/// What an upsert did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// File was not catalogued before.
    Inserted,
    /// File was catalogued with a different modification time; its
    /// variable records were replaced.
    Replaced,
    /// Same path and modification time; nothing written.
    Unchanged,
}

/// Catalogued state of one file, used to skip unchanged files before
/// opening them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub experiment: String,
    pub path: String,
    pub mod_time: String,
    pub file_size: i64,
}

/// Row counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub configurations: usize,
    pub experiments: usize,
    pub files: usize,
    pub variables: usize,
}

/// Parse a TEXT column through `FromStr`, surfacing failures as conversion errors.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read a coverage stored as two nullable date columns.
pub(crate) fn coverage_columns(
    row: &Row<'_>,
    start_idx: usize,
    end_idx: usize,
) -> rusqlite::Result<Option<TimeCoverage>> {
    let start: Option<CalendarDate> = parse_optional_column(row, start_idx)?;
    let end: Option<CalendarDate> = parse_optional_column(row, end_idx)?;
    Ok(match (start, end) {
        (Some(start), Some(end)) => Some(TimeCoverage::new(start, end)),
        _ => None,
    })
}

/// Columns written for an optional coverage: (start, end, start_key, end_key).
pub(crate) fn coverage_params(
    coverage: Option<&TimeCoverage>,
) -> (Option<String>, Option<String>, Option<i64>, Option<i64>) {
    match coverage {
        Some(c) => (
            Some(c.start.to_string()),
            Some(c.end.to_string()),
            Some(c.start.sort_key()),
            Some(c.end.sort_key()),
        ),
        None => (None, None, None, None),
    }
}
