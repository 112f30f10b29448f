use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

use expcat_types::{
    Experiment, ExperimentRef, Frequency, NcFile, ResolvedFile, VariableRecord, VariableSummary,
};

use crate::queries::{experiment, ncfile, variable};
use crate::records::{CatalogCounts, FileState, UpsertOutcome};
use crate::schema::{SCHEMA_VERSION, init_schema};
use crate::{Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the catalog for writing.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::StoreUnavailable {
                path: db_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| Error::StoreUnavailable {
            path: db_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        configure(&conn)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        let db = Self { conn };
        init_schema(&db.conn)?;
        tracing::debug!(path = %db_path.display(), "opened catalog");
        Ok(db)
    }

    /// Open an existing catalog for queries only.
    pub fn open_read_only(db_path: &Path) -> Result<Self> {
        if !db_path.is_file() {
            return Err(Error::StoreUnavailable {
                path: db_path.to_path_buf(),
                reason: "no catalog file; run `expcat index` first".to_string(),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(db_path, flags).map_err(|e| Error::StoreUnavailable {
                path: db_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        configure(&conn)?;

        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version != SCHEMA_VERSION {
            return Err(Error::StoreUnavailable {
                path: db_path.to_path_buf(),
                reason: format!(
                    "catalog schema version {} does not match {}; re-run `expcat index`",
                    version, SCHEMA_VERSION
                ),
            });
        }

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        let db = Self { conn };
        init_schema(&db.conn)?;
        Ok(db)
    }

    /// Record one file and its variables atomically.
    ///
    /// Same path and modification time is a no-op. A changed modification
    /// time replaces the file's variable records. Coverage overlapping
    /// another file of the same (experiment, variable, frequency) and an
    /// experiment name reused under another root are rejected without
    /// writing anything.
    pub fn upsert(
        &self,
        experiment: &ExperimentRef,
        file: &NcFile,
        variables: &[VariableRecord],
    ) -> Result<UpsertOutcome> {
        self.store(experiment, file, variables, true)
    }

    /// Like [`Database::upsert`], but rewrites the records even when the
    /// modification time is unchanged.
    pub fn replace(
        &self,
        experiment: &ExperimentRef,
        file: &NcFile,
        variables: &[VariableRecord],
    ) -> Result<UpsertOutcome> {
        self.store(experiment, file, variables, false)
    }

    fn store(
        &self,
        experiment: &ExperimentRef,
        file: &NcFile,
        variables: &[VariableRecord],
        skip_unchanged: bool,
    ) -> Result<UpsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let existing = ncfile::find(&tx, &experiment.name, &file.path)?;
        if skip_unchanged
            && let Some((_, mod_time)) = &existing
            && *mod_time == file.mod_time
        {
            return Ok(UpsertOutcome::Unchanged);
        }

        experiment::ensure(&tx, experiment)?;
        variable::check_overlap(&tx, &experiment.name, &file.path, variables)?;

        let outcome = match existing {
            Some((id, _)) => {
                ncfile::delete(&tx, id)?;
                UpsertOutcome::Replaced
            }
            None => UpsertOutcome::Inserted,
        };

        let id = ncfile::insert(&tx, file)?;
        variable::insert_all(&tx, id, variables)?;
        tx.commit()?;

        tracing::debug!(path = %file.path, ?outcome, variables = variables.len(), "catalogued file");
        Ok(outcome)
    }

    pub fn list_experiments(&self, keyword: Option<&str>) -> Result<Vec<Experiment>> {
        experiment::list(&self.conn, keyword)
    }

    pub fn get_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        experiment::get(&self.conn, name)
    }

    pub fn list_keywords(&self) -> Result<Vec<String>> {
        experiment::keywords(&self.conn)
    }

    pub fn list_files(&self, experiment_name: &str) -> Result<Vec<NcFile>> {
        experiment::require(&self.conn, experiment_name)?;
        ncfile::list(&self.conn, experiment_name)
    }

    pub fn list_variables(
        &self,
        experiment_name: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<String>> {
        experiment::require(&self.conn, experiment_name)?;
        variable::names(&self.conn, experiment_name, frequency)
    }

    pub fn list_frequencies(&self, experiment_name: Option<&str>) -> Result<Vec<Frequency>> {
        if let Some(name) = experiment_name {
            experiment::require(&self.conn, name)?;
        }
        variable::frequencies(&self.conn, experiment_name)
    }

    pub fn resolve(
        &self,
        experiment_name: &str,
        variable_name: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<ResolvedFile>> {
        experiment::require(&self.conn, experiment_name)?;
        variable::resolve(&self.conn, experiment_name, variable_name, frequency)
    }

    pub fn variable_summaries(
        &self,
        experiment_name: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<VariableSummary>> {
        experiment::require(&self.conn, experiment_name)?;
        variable::summaries(&self.conn, experiment_name, frequency)
    }

    /// Drop a file and its variables; returns whether it was catalogued.
    pub fn remove_file(&self, experiment_name: &str, path: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = ncfile::remove(&tx, experiment_name, path)?;
        tx.commit()?;
        Ok(removed)
    }

    pub fn file_states(&self) -> Result<Vec<FileState>> {
        ncfile::states(&self.conn)
    }

    pub fn counts(&self) -> Result<CatalogCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as usize)
        };
        Ok(CatalogCounts {
            configurations: count("configurations")?,
            experiments: count("experiments")?,
            files: ncfile::count(&self.conn)?,
            variables: variable::count(&self.conn)?,
        })
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute("VACUUM", [])?;
        tracing::info!("catalog vacuumed");
        Ok(())
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expcat_types::{CalendarDate, ExperimentMetadata, TimeCoverage};

    fn experiment_ref(name: &str) -> ExperimentRef {
        ExperimentRef {
            name: name.to_string(),
            configuration: "1deg_jra55".to_string(),
            root_dir: format!("/archive/1deg_jra55/{}", name),
            metadata: ExperimentMetadata::default(),
        }
    }

    fn years(a: i64, b: i64) -> TimeCoverage {
        TimeCoverage::new(CalendarDate::ymd(a, 1, 1), CalendarDate::ymd(b, 12, 1))
    }

    fn file(experiment: &str, path: &str, coverage: Option<TimeCoverage>) -> NcFile {
        NcFile {
            path: path.to_string(),
            experiment: experiment.to_string(),
            output_dir: "output000".to_string(),
            ingested_at: "2024-01-01T00:00:00+00:00".to_string(),
            mod_time: "2024-01-01T00:00:00.000000000Z".to_string(),
            file_size: 1024,
            frequency: if coverage.is_some() {
                Frequency::monthly()
            } else {
                Frequency::Static
            },
            coverage,
            time_units: coverage.map(|_| "days since 1900-01-01".to_string()),
            calendar: None,
        }
    }

    fn var(name: &str, coverage: Option<TimeCoverage>) -> VariableRecord {
        VariableRecord {
            name: name.to_string(),
            dimensions: vec!["time".to_string(), "yt".to_string(), "xt".to_string()],
            frequency: if coverage.is_some() {
                Frequency::monthly()
            } else {
                Frequency::Static
            },
            coverage,
            units: Some("degC".to_string()),
            long_name: Some("Potential temperature".to_string()),
            standard_name: None,
            coordinate: false,
        }
    }

    #[test]
    fn test_schema_initialization() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.list_experiments(None).unwrap().is_empty());
        assert_eq!(db.counts().unwrap(), CatalogCounts::default());
    }

    #[test]
    fn test_upsert_outcomes() {
        let db = Database::open_in_memory().unwrap();
        let exp = experiment_ref("iaf");
        let cov = Some(years(1958, 1967));
        let f = file("iaf", "/a/ocean_1958.nc", cov);

        assert_eq!(
            db.upsert(&exp, &f, &[var("temp", cov)]).unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            db.upsert(&exp, &f, &[var("temp", cov)]).unwrap(),
            UpsertOutcome::Unchanged
        );

        let mut touched = f.clone();
        touched.mod_time = "2024-02-01T00:00:00.000000000Z".to_string();
        assert_eq!(
            db.upsert(&exp, &touched, &[var("salt", cov)]).unwrap(),
            UpsertOutcome::Replaced
        );
        assert_eq!(db.list_variables("iaf", None).unwrap(), vec!["salt"]);
        assert_eq!(db.counts().unwrap().files, 1);

        assert_eq!(
            db.replace(&exp, &touched, &[var("temp", cov)]).unwrap(),
            UpsertOutcome::Replaced
        );
        assert_eq!(db.list_variables("iaf", None).unwrap(), vec!["temp"]);
    }

    #[test]
    fn test_overlapping_coverage_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let exp = experiment_ref("iaf");
        let a = Some(years(1958, 1967));
        let b = Some(years(1967, 1976));

        db.upsert(&exp, &file("iaf", "/a/1.nc", a), &[var("temp", a)])
            .unwrap();
        let err = db
            .upsert(&exp, &file("iaf", "/a/2.nc", b), &[var("temp", b)])
            .unwrap_err();
        assert!(matches!(err, Error::OverlappingCoverage { ref existing, .. } if existing == "/a/1.nc"));
        assert!(err.is_per_file());
        assert_eq!(db.counts().unwrap().files, 1);
    }

    #[test]
    fn test_shared_time_axis_does_not_overlap() {
        let db = Database::open_in_memory().unwrap();
        let exp = experiment_ref("iaf");
        let cov = Some(years(1958, 1967));
        let time = |cov| VariableRecord {
            coordinate: true,
            ..var("time", cov)
        };

        db.upsert(&exp, &file("iaf", "/a/ocean.nc", cov), &[time(cov), var("temp", cov)])
            .unwrap();
        db.upsert(
            &exp,
            &file("iaf", "/a/ocean_month.nc", cov),
            &[time(cov), var("salt", cov)],
        )
        .unwrap();

        assert_eq!(db.counts().unwrap().files, 2);
        assert_eq!(db.list_variables("iaf", None).unwrap(), vec!["salt", "temp", "time"]);
        let axis = db.resolve("iaf", "time", None).unwrap();
        assert_eq!(axis.len(), 1);
        assert_eq!(axis[0].file.path, "/a/ocean.nc");
    }

    #[test]
    fn test_experiment_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.upsert(&experiment_ref("iaf"), &file("iaf", "/a/1.nc", None), &[])
            .unwrap();

        let mut elsewhere = experiment_ref("iaf");
        elsewhere.root_dir = "/other/iaf".to_string();
        let err = db
            .upsert(&elsewhere, &file("iaf", "/other/1.nc", None), &[])
            .unwrap_err();
        assert!(matches!(err, Error::ExperimentConflict { .. }));
    }

    #[test]
    fn test_resolve_ambiguity_and_missing() {
        let db = Database::open_in_memory().unwrap();
        let exp = experiment_ref("iaf");
        let cov = Some(years(1958, 1967));
        db.upsert(&exp, &file("iaf", "/a/month.nc", cov), &[var("temp", cov)])
            .unwrap();

        let mut daily = var("temp", cov);
        daily.frequency = Frequency::daily();
        let mut daily_file = file("iaf", "/a/day.nc", cov);
        daily_file.frequency = Frequency::daily();
        db.upsert(&exp, &daily_file, &[daily]).unwrap();

        assert!(matches!(
            db.resolve("iaf", "temp", None),
            Err(Error::AmbiguousFrequency { .. })
        ));
        let monthly = db.resolve("iaf", "temp", Some(Frequency::monthly())).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].file.path, "/a/month.nc");
        assert_eq!(monthly[0].variable.dimensions, vec!["time", "yt", "xt"]);

        assert!(matches!(
            db.resolve("iaf", "u", None),
            Err(Error::VariableNotFound { .. })
        ));
        assert!(matches!(
            db.resolve("ryf", "temp", None),
            Err(Error::ExperimentNotFound(_))
        ));
    }

    #[test]
    fn test_remove_file() {
        let db = Database::open_in_memory().unwrap();
        db.upsert(&experiment_ref("iaf"), &file("iaf", "/a/1.nc", None), &[var("area_t", None)])
            .unwrap();
        assert!(db.remove_file("iaf", "/a/1.nc").unwrap());
        assert!(!db.remove_file("iaf", "/a/1.nc").unwrap());
        assert_eq!(db.counts().unwrap().variables, 0);
    }
}
