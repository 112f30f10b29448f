//! CatalogWorld pattern for declarative integration test setup.
//!
//! Provides a fluent interface for:
//! - Creating an isolated archive tree and catalog path
//! - Placing netCDF fixtures at `configuration/experiment/output_dir/`
//! - Executing CLI commands against the isolated catalog

use anyhow::Result;
use assert_cmd::Command;
use filetime::FileTime;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::fixtures::{TimeSeriesFixture, write_corrupt_file, write_oversized_file};

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use expcat_testing::{CatalogWorld, TimeSeriesFixture};
///
/// let world = CatalogWorld::new()
///     .with_file("cfg", "exp", "output000", "ocean.nc", &TimeSeriesFixture::monthly(1900, 1));
///
/// let result = world.run(&["index"]).unwrap();
/// assert!(result.success());
/// ```
pub struct CatalogWorld {
    temp_dir: TempDir,
    root: PathBuf,
    db_path: PathBuf,
}

impl Default for CatalogWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogWorld {
    /// Create a new isolated test environment with an empty archive root.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("archive");
        std::fs::create_dir_all(&root).expect("Failed to create archive root");
        let db_path = temp_dir.path().join("catalog.db");

        Self {
            temp_dir,
            root,
            db_path,
        }
    }

    /// Archive root holding configuration directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Catalog database path (not created until an index run).
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a file in the archive layout.
    pub fn file_path(&self, configuration: &str, experiment: &str, output_dir: &str, name: &str) -> PathBuf {
        self.root
            .join(configuration)
            .join(experiment)
            .join(output_dir)
            .join(name)
    }

    pub fn experiment_dir(&self, configuration: &str, experiment: &str) -> PathBuf {
        self.root.join(configuration).join(experiment)
    }

    /// Write a fixture file into the archive.
    pub fn with_file(
        self,
        configuration: &str,
        experiment: &str,
        output_dir: &str,
        name: &str,
        fixture: &TimeSeriesFixture,
    ) -> Self {
        self.add_file(configuration, experiment, output_dir, name, fixture)
            .expect("Failed to write fixture");
        self
    }

    pub fn add_file(
        &self,
        configuration: &str,
        experiment: &str,
        output_dir: &str,
        name: &str,
        fixture: &TimeSeriesFixture,
    ) -> Result<PathBuf> {
        let path = self.file_path(configuration, experiment, output_dir, name);
        fixture.write(&path)?;
        Ok(path)
    }

    /// Write a file with a netCDF name and magic but a broken header.
    pub fn add_corrupt_file(
        &self,
        configuration: &str,
        experiment: &str,
        output_dir: &str,
        name: &str,
    ) -> Result<PathBuf> {
        let path = self.file_path(configuration, experiment, output_dir, name);
        write_corrupt_file(&path)?;
        Ok(path)
    }

    /// Write a netCDF header whose declared data size overflows.
    pub fn add_oversized_file(
        &self,
        configuration: &str,
        experiment: &str,
        output_dir: &str,
        name: &str,
    ) -> Result<PathBuf> {
        let path = self.file_path(configuration, experiment, output_dir, name);
        write_oversized_file(&path)?;
        Ok(path)
    }

    /// Write `metadata.yaml` for an experiment.
    pub fn with_metadata(self, configuration: &str, experiment: &str, yaml: &str) -> Self {
        let dir = self.experiment_dir(configuration, experiment);
        std::fs::create_dir_all(&dir).expect("Failed to create experiment dir");
        std::fs::write(dir.join("metadata.yaml"), yaml).expect("Failed to write metadata");
        self
    }

    /// Pin a file's modification time to `unix_seconds`.
    pub fn set_mtime(&self, path: &Path, unix_seconds: i64) -> Result<()> {
        let time = FileTime::from_unix_time(unix_seconds, 0);
        filetime::set_file_mtime(path, time)?;
        Ok(())
    }

    /// Configure a CLI command with this test environment's settings.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--db")
            .arg(&self.db_path)
            .arg("--format")
            .arg("plain")
            .env_remove("EXPCAT_DB")
            .env_remove("RUST_LOG")
            .current_dir(self.temp_dir.path());
        cmd
    }

    /// Run the `expcat` binary with `args`; `index` without roots scans
    /// this world's archive root.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("expcat")
            .map_err(|e| anyhow::anyhow!("Failed to find expcat binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);
        if args == ["index"] {
            cmd.arg(&self.root);
        }

        let output = cmd.output()?;

        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
