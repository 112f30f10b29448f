use expcat_types::{Experiment, ExperimentMetadata, ExperimentRef};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Error, Result};

/// Record the experiment (and its configuration) if new; refresh its
/// metadata otherwise. A known name under a different root is a conflict.
pub fn ensure(conn: &Connection, experiment: &ExperimentRef) -> Result<()> {
    let existing_root: Option<String> = conn
        .query_row(
            "SELECT root_dir FROM experiments WHERE name = ?1",
            [&experiment.name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(existing_root) = existing_root
        && existing_root != experiment.root_dir
    {
        return Err(Error::ExperimentConflict {
            experiment: experiment.name.clone(),
            existing_root,
            new_root: experiment.root_dir.clone(),
        });
    }

    conn.execute(
        "INSERT OR IGNORE INTO configurations (name) VALUES (?1)",
        [&experiment.configuration],
    )?;

    let meta = &experiment.metadata;
    conn.execute(
        r#"
        INSERT INTO experiments (name, configuration, root_dir, contact, email, created, description, notes, url)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(name) DO UPDATE SET
            contact = ?4,
            email = ?5,
            created = ?6,
            description = ?7,
            notes = ?8,
            url = ?9
        "#,
        params![
            &experiment.name,
            &experiment.configuration,
            &experiment.root_dir,
            &meta.contact,
            &meta.email,
            &meta.created,
            &meta.description,
            &meta.notes,
            &meta.url
        ],
    )?;

    conn.execute(
        "DELETE FROM keywords WHERE experiment = ?1",
        [&experiment.name],
    )?;
    for keyword in &meta.keywords {
        conn.execute(
            "INSERT OR IGNORE INTO keywords (experiment, keyword) VALUES (?1, ?2)",
            params![&experiment.name, keyword],
        )?;
    }

    Ok(())
}

pub fn exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM experiments WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn require(conn: &Connection, name: &str) -> Result<()> {
    if exists(conn, name)? {
        Ok(())
    } else {
        Err(Error::ExperimentNotFound(name.to_string()))
    }
}

const EXPERIMENT_COLUMNS: &str =
    "name, configuration, root_dir, contact, email, created, description, notes, url";

fn experiment_from_row(row: &Row<'_>) -> rusqlite::Result<Experiment> {
    Ok(Experiment {
        name: row.get(0)?,
        configuration: row.get(1)?,
        root_dir: row.get(2)?,
        output_dirs: Vec::new(),
        file_count: 0,
        metadata: ExperimentMetadata {
            contact: row.get(3)?,
            email: row.get(4)?,
            created: row.get(5)?,
            description: row.get(6)?,
            notes: row.get(7)?,
            url: row.get(8)?,
            keywords: Vec::new(),
        },
    })
}

/// Experiments in alphabetical order, optionally only those tagged `keyword`.
pub fn list(conn: &Connection, keyword: Option<&str>) -> Result<Vec<Experiment>> {
    let mut experiments = match keyword {
        Some(keyword) => {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}
                FROM experiments
                WHERE name IN (SELECT experiment FROM keywords WHERE keyword = ?1)
                ORDER BY name
                "#,
                EXPERIMENT_COLUMNS
            ))?;
            stmt.query_map([keyword.trim().to_lowercase()], experiment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM experiments ORDER BY name",
                EXPERIMENT_COLUMNS
            ))?;
            stmt.query_map([], experiment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    for experiment in &mut experiments {
        fill_details(conn, experiment)?;
    }
    Ok(experiments)
}

pub fn get(conn: &Connection, name: &str) -> Result<Option<Experiment>> {
    let experiment = conn
        .query_row(
            &format!(
                "SELECT {} FROM experiments WHERE name = ?1",
                EXPERIMENT_COLUMNS
            ),
            [name],
            experiment_from_row,
        )
        .optional()?;

    match experiment {
        Some(mut experiment) => {
            fill_details(conn, &mut experiment)?;
            Ok(Some(experiment))
        }
        None => Ok(None),
    }
}

fn fill_details(conn: &Connection, experiment: &mut Experiment) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT output_dir FROM ncfiles WHERE experiment = ?1 ORDER BY output_dir",
    )?;
    experiment.output_dirs = stmt
        .query_map([&experiment.name], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ncfiles WHERE experiment = ?1",
        [&experiment.name],
        |row| row.get(0),
    )?;
    experiment.file_count = count as usize;

    let mut stmt =
        conn.prepare("SELECT keyword FROM keywords WHERE experiment = ?1 ORDER BY keyword")?;
    experiment.metadata.keywords = stmt
        .query_map([&experiment.name], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(())
}

/// All keywords in use, sorted.
pub fn keywords(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT keyword FROM keywords ORDER BY keyword")?;
    let keywords = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(keywords)
}
