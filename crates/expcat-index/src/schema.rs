use rusqlite::Connection;

use crate::Result;

// Schema version (increment when changing table definitions)
pub const SCHEMA_VERSION: i32 = 4;

// NOTE: the catalog is derived data. Every row can be rebuilt by scanning
// the archive again, so a version mismatch drops and recreates the tables
// instead of migrating them.
//
// Dates are stored twice: the display form for reading back and an integer
// ordering key (CalendarDate::sort_key) for ORDER BY and overlap checks,
// which keeps comparisons correct for any model calendar or year.

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != SCHEMA_VERSION {
        if current_version != 0 {
            tracing::info!(
                from = current_version,
                to = SCHEMA_VERSION,
                "catalog schema changed; dropping tables"
            );
        }
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS configurations (
            name TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS experiments (
            name TEXT PRIMARY KEY,
            configuration TEXT NOT NULL,
            root_dir TEXT NOT NULL,
            contact TEXT,
            email TEXT,
            created TEXT,
            description TEXT,
            notes TEXT,
            url TEXT,
            FOREIGN KEY (configuration) REFERENCES configurations(name)
        );

        CREATE TABLE IF NOT EXISTS keywords (
            experiment TEXT NOT NULL,
            keyword TEXT NOT NULL,
            PRIMARY KEY (experiment, keyword),
            FOREIGN KEY (experiment) REFERENCES experiments(name) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS ncfiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            experiment TEXT NOT NULL,
            path TEXT NOT NULL,
            output_dir TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            mod_time TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            frequency TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            start_key INTEGER,
            end_key INTEGER,
            time_units TEXT,
            calendar TEXT,
            UNIQUE (experiment, path),
            FOREIGN KEY (experiment) REFERENCES experiments(name)
        );

        CREATE TABLE IF NOT EXISTS variables (
            ncfile_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            dimensions TEXT NOT NULL,
            frequency TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            start_key INTEGER,
            end_key INTEGER,
            units TEXT,
            long_name TEXT,
            standard_name TEXT,
            coordinate INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (ncfile_id, name),
            FOREIGN KEY (ncfile_id) REFERENCES ncfiles(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_experiments_configuration ON experiments(configuration);
        CREATE INDEX IF NOT EXISTS idx_ncfiles_experiment ON ncfiles(experiment);
        CREATE INDEX IF NOT EXISTS idx_ncfiles_order ON ncfiles(experiment, start_key, path);
        CREATE INDEX IF NOT EXISTS idx_variables_name ON variables(name, frequency);
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS variables;
        DROP TABLE IF EXISTS ncfiles;
        DROP TABLE IF EXISTS keywords;
        DROP TABLE IF EXISTS experiments;
        DROP TABLE IF EXISTS configurations;
        "#,
    )?;
    Ok(())
}
