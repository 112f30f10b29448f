use expcat_types::NcFile;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::Result;
use crate::records::{
    FileState, coverage_columns, coverage_params, parse_column, parse_optional_column,
};

/// Row id and stored modification time of a catalogued file.
pub fn find(conn: &Connection, experiment: &str, path: &str) -> Result<Option<(i64, String)>> {
    let found = conn
        .query_row(
            "SELECT id, mod_time FROM ncfiles WHERE experiment = ?1 AND path = ?2",
            params![experiment, path],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn insert(conn: &Connection, file: &NcFile) -> Result<i64> {
    let (start_time, end_time, start_key, end_key) = coverage_params(file.coverage.as_ref());
    conn.execute(
        r#"
        INSERT INTO ncfiles (
            experiment, path, output_dir, ingested_at, mod_time, file_size, frequency,
            start_time, end_time, start_key, end_key, time_units, calendar
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            &file.experiment,
            &file.path,
            &file.output_dir,
            &file.ingested_at,
            &file.mod_time,
            file.file_size,
            file.frequency.to_string(),
            start_time,
            end_time,
            start_key,
            end_key,
            &file.time_units,
            file.calendar.map(|c| c.as_str().to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete a file row and its variable records.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM variables WHERE ncfile_id = ?1", [id])?;
    conn.execute("DELETE FROM ncfiles WHERE id = ?1", [id])?;
    Ok(())
}

pub(crate) const NCFILE_COLUMNS: &str = "f.path, f.experiment, f.output_dir, f.ingested_at, f.mod_time, \
     f.file_size, f.frequency, f.start_time, f.end_time, f.time_units, f.calendar";

/// Number of columns in [`NCFILE_COLUMNS`].
pub(crate) const NCFILE_COLUMN_COUNT: usize = 11;

pub(crate) fn ncfile_from_row(row: &Row<'_>) -> rusqlite::Result<NcFile> {
    Ok(NcFile {
        path: row.get(0)?,
        experiment: row.get(1)?,
        output_dir: row.get(2)?,
        ingested_at: row.get(3)?,
        mod_time: row.get(4)?,
        file_size: row.get(5)?,
        frequency: parse_column(row, 6)?,
        coverage: coverage_columns(row, 7, 8)?,
        time_units: row.get(9)?,
        calendar: parse_optional_column(row, 10)?,
    })
}

/// Files of an experiment ordered by earliest coverage, then path; files
/// without coverage come last.
pub fn list(conn: &Connection, experiment: &str) -> Result<Vec<NcFile>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM ncfiles f
        WHERE f.experiment = ?1
        ORDER BY f.start_key IS NULL, f.start_key, f.path
        "#,
        NCFILE_COLUMNS
    ))?;

    let files = stmt
        .query_map([experiment], ncfile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(files)
}

pub fn states(conn: &Connection) -> Result<Vec<FileState>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT experiment, path, mod_time, file_size
        FROM ncfiles
        ORDER BY path
        "#,
    )?;

    let states = stmt
        .query_map([], |row| {
            Ok(FileState {
                experiment: row.get(0)?,
                path: row.get(1)?,
                mod_time: row.get(2)?,
                file_size: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(states)
}

pub fn remove(conn: &Connection, experiment: &str, path: &str) -> Result<bool> {
    match find(conn, experiment, path)? {
        Some((id, _)) => {
            delete(conn, id)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM ncfiles", [], |row| row.get(0))?;
    Ok(count as usize)
}
