use std::collections::BTreeMap;

use expcat_types::{Frequency, ResolvedFile, TimeCoverage, VariableRecord, VariableSummary};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use crate::queries::ncfile::{NCFILE_COLUMN_COUNT, NCFILE_COLUMNS, ncfile_from_row};
use crate::records::{coverage_columns, coverage_params, parse_column};
use crate::{Error, Result};

pub fn insert_all(conn: &Connection, ncfile_id: i64, variables: &[VariableRecord]) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO variables (
            ncfile_id, name, dimensions, frequency, start_time, end_time,
            start_key, end_key, units, long_name, standard_name, coordinate
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )?;

    for var in variables {
        let (start_time, end_time, start_key, end_key) = coverage_params(var.coverage.as_ref());
        stmt.execute(params![
            ncfile_id,
            &var.name,
            serde_json::to_string(&var.dimensions)?,
            var.frequency.to_string(),
            start_time,
            end_time,
            start_key,
            end_key,
            &var.units,
            &var.long_name,
            &var.standard_name,
            var.coordinate,
        ])?;
    }
    Ok(())
}

/// Reject `variables` of the file at `path` whose coverage overlaps a
/// catalogued file with the same (experiment, variable, frequency).
/// Coordinate variables are shared between files and never conflict.
pub fn check_overlap(
    conn: &Connection,
    experiment: &str,
    path: &str,
    variables: &[VariableRecord],
) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        SELECT f.path
        FROM variables v
        JOIN ncfiles f ON f.id = v.ncfile_id
        WHERE f.experiment = ?1
          AND v.name = ?2
          AND v.frequency = ?3
          AND f.path != ?4
          AND v.start_key <= ?6
          AND ?5 <= v.end_key
        ORDER BY v.start_key
        LIMIT 1
        "#,
    )?;

    for var in variables.iter().filter(|v| !v.coordinate) {
        let Some(coverage) = &var.coverage else {
            continue;
        };
        let mut rows = stmt.query(params![
            experiment,
            &var.name,
            var.frequency.to_string(),
            path,
            coverage.start.sort_key(),
            coverage.end.sort_key(),
        ])?;
        if let Some(row) = rows.next()? {
            return Err(Error::OverlappingCoverage {
                experiment: experiment.to_string(),
                variable: var.name.clone(),
                frequency: var.frequency,
                path: path.to_string(),
                existing: row.get(0)?,
            });
        }
    }
    Ok(())
}

/// Distinct variable names of an experiment, sorted.
pub fn names(
    conn: &Connection,
    experiment: &str,
    frequency: Option<Frequency>,
) -> Result<Vec<String>> {
    let mut sql = String::from(
        r#"
        SELECT DISTINCT v.name
        FROM variables v
        JOIN ncfiles f ON f.id = v.ncfile_id
        WHERE f.experiment = ?1
        "#,
    );
    let frequency = frequency.map(|f| f.to_string());
    if frequency.is_some() {
        sql.push_str(" AND v.frequency = ?2");
    }
    sql.push_str(" ORDER BY v.name");

    let get_name = |row: &Row<'_>| row.get::<_, String>(0);
    let mut stmt = conn.prepare(&sql)?;
    let names = match &frequency {
        Some(f) => stmt.query_map(params![experiment, f], get_name)?,
        None => stmt.query_map(params![experiment], get_name)?,
    }
    .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Distinct frequency labels, across the catalog or within one experiment.
pub fn frequencies(conn: &Connection, experiment: Option<&str>) -> Result<Vec<Frequency>> {
    let mut frequencies: Vec<Frequency> = match experiment {
        Some(experiment) => {
            let mut stmt = conn.prepare(
                r#"
                SELECT DISTINCT v.frequency
                FROM variables v
                JOIN ncfiles f ON f.id = v.ncfile_id
                WHERE f.experiment = ?1
                "#,
            )?;
            stmt.query_map([experiment], |row| parse_column(row, 0))?
                .collect::<std::result::Result<_, _>>()?
        }
        None => {
            let mut stmt = conn.prepare("SELECT DISTINCT frequency FROM variables")?;
            stmt.query_map([], |row| parse_column(row, 0))?
                .collect::<std::result::Result<_, _>>()?
        }
    };
    frequencies.sort();
    frequencies.dedup();
    Ok(frequencies)
}

fn variable_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<VariableRecord> {
    let dims_json: String = row.get(offset + 1)?;
    let dimensions = serde_json::from_str(&dims_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(offset + 1, Type::Text, Box::new(e))
    })?;
    Ok(VariableRecord {
        name: row.get(offset)?,
        dimensions,
        frequency: parse_column(row, offset + 2)?,
        coverage: coverage_columns(row, offset + 3, offset + 4)?,
        units: row.get(offset + 5)?,
        long_name: row.get(offset + 6)?,
        standard_name: row.get(offset + 7)?,
        coordinate: row.get(offset + 8)?,
    })
}

const VARIABLE_COLUMNS: &str = "v.name, v.dimensions, v.frequency, v.start_time, v.end_time, \
     v.units, v.long_name, v.standard_name, v.coordinate";

/// Files of `experiment` holding `variable`, in time order.
pub fn resolve(
    conn: &Connection,
    experiment: &str,
    variable: &str,
    frequency: Option<Frequency>,
) -> Result<Vec<ResolvedFile>> {
    let mut sql = format!(
        r#"
        SELECT {}, {}
        FROM variables v
        JOIN ncfiles f ON f.id = v.ncfile_id
        WHERE f.experiment = ?1 AND v.name = ?2
        "#,
        NCFILE_COLUMNS, VARIABLE_COLUMNS
    );
    let label = frequency.map(|f| f.to_string());
    if label.is_some() {
        sql.push_str(" AND v.frequency = ?3");
    }
    sql.push_str(" ORDER BY v.start_key IS NULL, v.start_key, f.path");

    let map_row = |row: &Row<'_>| -> rusqlite::Result<ResolvedFile> {
        Ok(ResolvedFile {
            file: ncfile_from_row(row)?,
            variable: variable_from_row(row, NCFILE_COLUMN_COUNT)?,
        })
    };

    let mut stmt = conn.prepare(&sql)?;
    let resolved = match &label {
        Some(f) => stmt.query_map(params![experiment, variable, f], map_row)?,
        None => stmt.query_map(params![experiment, variable], map_row)?,
    }
    .collect::<std::result::Result<Vec<ResolvedFile>, _>>()?;

    let resolved = first_per_period(resolved);
    if resolved.is_empty() {
        return Err(Error::VariableNotFound {
            experiment: experiment.to_string(),
            variable: variable.to_string(),
            frequency,
        });
    }

    if frequency.is_none() {
        let mut found: Vec<Frequency> = resolved.iter().map(|r| r.variable.frequency).collect();
        found.sort();
        found.dedup();
        if found.len() > 1 {
            return Err(Error::AmbiguousFrequency {
                experiment: experiment.to_string(),
                variable: variable.to_string(),
                frequencies: found,
            });
        }
    }

    Ok(resolved)
}

/// A coordinate shared by several files of one period is served from the
/// first of them, so the resolved list stays non-overlapping.
fn first_per_period(resolved: Vec<ResolvedFile>) -> Vec<ResolvedFile> {
    let mut kept: Vec<ResolvedFile> = Vec::with_capacity(resolved.len());
    for r in resolved {
        let shadowed = r.variable.coordinate
            && kept.last().is_some_and(|prev| {
                prev.variable.frequency == r.variable.frequency
                    && match (&prev.variable.coverage, &r.variable.coverage) {
                        (Some(prev), Some(cur)) => prev.overlaps(cur),
                        _ => false,
                    }
            });
        if !shadowed {
            kept.push(r);
        }
    }
    kept
}

/// One summary per (variable, frequency) of an experiment.
pub fn summaries(
    conn: &Connection,
    experiment: &str,
    frequency: Option<Frequency>,
) -> Result<Vec<VariableSummary>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT v.name, v.frequency, v.long_name, v.units, v.start_time, v.end_time
        FROM variables v
        JOIN ncfiles f ON f.id = v.ncfile_id
        WHERE f.experiment = ?1
        ORDER BY v.name, v.start_key
        "#,
    )?;

    let rows = stmt
        .query_map([experiment], |row| {
            Ok((
                row.get::<_, String>(0)?,
                parse_column::<Frequency>(row, 1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                coverage_columns(row, 4, 5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: BTreeMap<(String, Frequency), VariableSummary> = BTreeMap::new();
    for (name, freq, long_name, units, coverage) in rows {
        if frequency.is_some_and(|f| f != freq) {
            continue;
        }
        let entry = grouped
            .entry((name.clone(), freq))
            .or_insert_with(|| VariableSummary {
                name,
                frequency: freq,
                long_name: None,
                units: None,
                file_count: 0,
                coverage: None,
            });
        entry.file_count += 1;
        entry.long_name = entry.long_name.take().or(long_name);
        entry.units = entry.units.take().or(units);
        entry.coverage = merge_coverage(entry.coverage, coverage);
    }

    Ok(grouped.into_values().collect())
}

fn merge_coverage(a: Option<TimeCoverage>, b: Option<TimeCoverage>) -> Option<TimeCoverage> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, b) => a.or(b),
    }
}

pub fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM variables", [], |row| row.get(0))?;
    Ok(count as usize)
}
