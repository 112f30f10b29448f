use crate::args::OutputFormat;
use anyhow::Result;
use expcat_index::Database;
use expcat_runtime::config::expand_tilde;
use expcat_runtime::{Config, Session, resolve_db_path};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

/// Settings resolved once per invocation and shared by every handler.
pub struct ExecutionContext {
    db_path: PathBuf,
    config_path: Option<PathBuf>,
    config: Config,
    pub format: OutputFormat,
    session: OnceCell<Session>,
}

impl ExecutionContext {
    pub fn new(db: Option<&str>, config: Option<&str>, format: OutputFormat) -> Result<Self> {
        // Without a data directory there is no default config; `--db` may
        // still be enough to run.
        let config_path = match config {
            Some(path) => Some(expand_tilde(path)),
            None => Config::default_path().ok(),
        };
        let config = match &config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };
        let db_path = resolve_db_path(db, &config)?;
        tracing::debug!(db = %db_path.display(), "resolved catalog path");

        Ok(Self {
            db_path,
            config_path,
            config,
            format,
            session: OnceCell::new(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Writable catalog, created on first use.
    pub fn open_database(&self) -> Result<Database> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Database::open(&self.db_path)?)
    }

    /// Read-only session on an existing catalog.
    pub fn session(&self) -> Result<&Session> {
        self.session
            .get_or_try_init(|| Ok(Session::open(&self.db_path)?))
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
