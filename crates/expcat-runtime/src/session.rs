use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use expcat_engine::{GetVarOptions, LazyArray};
use expcat_index::{CatalogCounts, Database};
use expcat_types::{Experiment, Frequency, NcFile, ResolvedFile, VariableSummary};

use crate::Result;
use crate::loader;

/// Read-only handle on one catalog.
///
/// Each query checks out its own connection from a pool shared by all
/// clones, so concurrent readers on several threads do not wait on each
/// other.
#[derive(Clone)]
pub struct Session {
    path: PathBuf,
    idle: Arc<Mutex<Vec<Database>>>,
}

/// A pooled connection, returned to the pool on drop.
struct Conn<'a> {
    db: Option<Database>,
    idle: &'a Mutex<Vec<Database>>,
}

impl Deref for Conn<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        // Only taken in drop.
        self.db.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for Conn<'_> {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            lock(self.idle).push(db);
        }
    }
}

fn lock(idle: &Mutex<Vec<Database>>) -> MutexGuard<'_, Vec<Database>> {
    // The pool only holds idle connections; a panicking holder cannot leave one half-used.
    idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("path", &self.path).finish()
    }
}

impl Session {
    /// Bind to the catalog at `path`. A missing or outdated catalog is
    /// `StoreUnavailable`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open_read_only(path)?;
        tracing::debug!(path = %path.display(), "session opened");
        Ok(Self {
            path: path.to_path_buf(),
            idle: Arc::new(Mutex::new(vec![db])),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An idle connection, or a fresh one when every connection is busy.
    fn db(&self) -> Result<Conn<'_>> {
        let pooled = lock(&self.idle).pop();
        let db = match pooled {
            Some(db) => db,
            None => {
                tracing::trace!(path = %self.path.display(), "opening extra connection");
                Database::open_read_only(&self.path)?
            }
        };
        Ok(Conn {
            db: Some(db),
            idle: &self.idle,
        })
    }

    /// Connections currently parked in the pool.
    #[cfg(test)]
    fn idle_connections(&self) -> usize {
        lock(&self.idle).len()
    }

    pub fn list_experiments(&self, keyword: Option<&str>) -> Result<Vec<Experiment>> {
        Ok(self.db()?.list_experiments(keyword)?)
    }

    pub fn experiment(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self.db()?.get_experiment(name)?)
    }

    pub fn list_keywords(&self) -> Result<Vec<String>> {
        Ok(self.db()?.list_keywords()?)
    }

    pub fn list_files(&self, experiment: &str) -> Result<Vec<NcFile>> {
        Ok(self.db()?.list_files(experiment)?)
    }

    pub fn list_variables(
        &self,
        experiment: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<String>> {
        Ok(self.db()?.list_variables(experiment, frequency)?)
    }

    pub fn variable_summaries(
        &self,
        experiment: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<VariableSummary>> {
        Ok(self.db()?.variable_summaries(experiment, frequency)?)
    }

    pub fn list_frequencies(&self, experiment: Option<&str>) -> Result<Vec<Frequency>> {
        Ok(self.db()?.list_frequencies(experiment)?)
    }

    pub fn resolve(
        &self,
        experiment: &str,
        variable: &str,
        frequency: Option<Frequency>,
    ) -> Result<Vec<ResolvedFile>> {
        Ok(self.db()?.resolve(experiment, variable, frequency)?)
    }

    pub fn counts(&self) -> Result<CatalogCounts> {
        Ok(self.db()?.counts()?)
    }

    /// Load `variable` of `experiment` as a lazy array.
    pub fn getvar(
        &self,
        experiment: &str,
        variable: &str,
        options: &GetVarOptions,
    ) -> Result<LazyArray> {
        loader::getvar(self, experiment, variable, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_session_is_send_and_sync() {
        assert_send_sync::<Session>();
    }

    #[test]
    fn test_missing_catalog_is_store_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = Session::open(&dir.path().join("catalog.db")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Index(expcat_index::Error::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_clones_share_the_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        drop(Database::open(&path).unwrap());

        let session = Session::open(&path).unwrap();
        let clone = session.clone();
        let handle = std::thread::spawn(move || clone.list_experiments(None).unwrap().len());
        assert_eq!(handle.join().unwrap(), 0);
        assert_eq!(session.counts().unwrap(), CatalogCounts::default());
    }

    #[test]
    fn test_busy_connection_does_not_block_other_readers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        drop(Database::open(&path).unwrap());

        let session = Session::open(&path).unwrap();
        {
            let held = session.db().unwrap();
            assert_eq!(session.idle_connections(), 0);

            let clone = session.clone();
            let handle = std::thread::spawn(move || clone.list_experiments(None).unwrap().len());
            assert_eq!(handle.join().unwrap(), 0);
            assert_eq!(held.counts().unwrap(), CatalogCounts::default());
        }
        assert_eq!(session.idle_connections(), 2);

        session.list_keywords().unwrap();
        assert_eq!(session.idle_connections(), 2);
    }
}
