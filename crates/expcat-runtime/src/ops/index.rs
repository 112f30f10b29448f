use expcat_index::{Database, FileState, UpsertOutcome};
use expcat_scanner::{FileCandidate, Scanner};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Re-scan every file even when its modification time is unchanged.
    pub force: bool,
    /// Drop catalog records of files under the roots that no longer exist.
    pub prune: bool,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone)]
pub enum IndexProgress {
    IncrementalHint {
        indexed_files: usize,
    },
    RootMissing {
        root: PathBuf,
    },
    RootScanning {
        root: PathBuf,
    },
    FileIndexed {
        path: PathBuf,
        outcome: UpsertOutcome,
    },
    FileSkipped {
        path: PathBuf,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
    FilePruned {
        path: PathBuf,
    },
    Completed {
        indexed_files: usize,
        skipped_files: usize,
        failed_files: usize,
        pruned_files: usize,
    },
}

/// A file the build could not catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Summary of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub started_at: String,
    pub roots: Vec<PathBuf>,
    pub inserted: usize,
    pub replaced: usize,
    /// Scanned, but the catalog already held identical records.
    pub unchanged: usize,
    /// Not opened because the modification time matched the catalog.
    pub skipped: usize,
    pub pruned: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl IndexReport {
    pub fn indexed(&self) -> usize {
        self.inserted + self.replaced + self.unchanged
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Replaced => self.replaced += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

pub struct IndexService<'a> {
    db: &'a Database,
    roots: Vec<PathBuf>,
    options: IndexOptions,
}

impl<'a> IndexService<'a> {
    pub fn new(db: &'a Database, roots: Vec<PathBuf>, options: IndexOptions) -> Self {
        Self { db, roots, options }
    }

    /// Walk every root and bring the catalog up to date.
    ///
    /// Per-file failures are collected into the report; only store errors
    /// abort the build.
    pub fn run<F>(&self, mut on_progress: F) -> Result<IndexReport>
    where
        F: FnMut(IndexProgress),
    {
        let mut report = IndexReport {
            started_at: chrono::Utc::now().to_rfc3339(),
            roots: self.roots.clone(),
            ..Default::default()
        };

        let states: HashMap<String, FileState> = self
            .db
            .file_states()?
            .into_iter()
            .map(|s| (s.path.clone(), s))
            .collect();

        if !self.options.force {
            on_progress(IndexProgress::IncrementalHint {
                indexed_files: states.len(),
            });
        }

        let mut scanner = Scanner::new().follow_symlinks(self.options.follow_symlinks);

        for root in &self.roots {
            if !root.exists() {
                tracing::warn!(root = %root.display(), "index root does not exist");
                on_progress(IndexProgress::RootMissing { root: root.clone() });
                continue;
            }

            tracing::info!(root = %root.display(), "scanning");
            on_progress(IndexProgress::RootScanning { root: root.clone() });

            for candidate in scanner.candidates(root) {
                let candidate = match candidate {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                        self.fail(&mut report, &mut on_progress, path, err.to_string());
                        continue;
                    }
                };

                if !self.options.force && is_unchanged(&candidate, &states) {
                    report.skipped += 1;
                    on_progress(IndexProgress::FileSkipped {
                        path: candidate.path,
                    });
                    continue;
                }

                let scanned = match scanner.scan_candidate(&candidate) {
                    Ok(scanned) => scanned,
                    Err(err) => {
                        self.fail(&mut report, &mut on_progress, candidate.path, err.to_string());
                        continue;
                    }
                };

                let stored = if self.options.force {
                    self.db
                        .replace(&scanned.experiment, &scanned.file, &scanned.variables)
                } else {
                    self.db
                        .upsert(&scanned.experiment, &scanned.file, &scanned.variables)
                };

                match stored {
                    Ok(outcome) => {
                        report.record(outcome);
                        on_progress(IndexProgress::FileIndexed {
                            path: candidate.path,
                            outcome,
                        });
                    }
                    Err(err) if err.is_per_file() => {
                        self.fail(&mut report, &mut on_progress, candidate.path, err.to_string());
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            if self.options.prune {
                self.prune(root, &states, &mut report, &mut on_progress)?;
            }
        }

        tracing::info!(
            inserted = report.inserted,
            replaced = report.replaced,
            skipped = report.skipped,
            failed = report.failures.len(),
            pruned = report.pruned.len(),
            "index build complete"
        );
        on_progress(IndexProgress::Completed {
            indexed_files: report.indexed(),
            skipped_files: report.skipped,
            failed_files: report.failures.len(),
            pruned_files: report.pruned.len(),
        });

        Ok(report)
    }

    fn fail<F>(&self, report: &mut IndexReport, on_progress: &mut F, path: PathBuf, error: String)
    where
        F: FnMut(IndexProgress),
    {
        tracing::warn!(path = %path.display(), %error, "file not catalogued");
        report.failures.push(FileFailure {
            path: path.clone(),
            error: error.clone(),
        });
        on_progress(IndexProgress::FileFailed { path, error });
    }

    fn prune<F>(
        &self,
        root: &Path,
        states: &HashMap<String, FileState>,
        report: &mut IndexReport,
        on_progress: &mut F,
    ) -> Result<()>
    where
        F: FnMut(IndexProgress),
    {
        let mut gone: Vec<&FileState> = states
            .values()
            .filter(|s| Path::new(&s.path).starts_with(root) && !Path::new(&s.path).exists())
            .collect();
        gone.sort_by(|a, b| a.path.cmp(&b.path));

        for state in gone {
            if self.db.remove_file(&state.experiment, &state.path)? {
                tracing::debug!(path = %state.path, "pruned missing file");
                let path = PathBuf::from(&state.path);
                report.pruned.push(path.clone());
                on_progress(IndexProgress::FilePruned { path });
            }
        }
        Ok(())
    }
}

fn is_unchanged(candidate: &FileCandidate, states: &HashMap<String, FileState>) -> bool {
    states.get(&candidate.path_str()).is_some_and(|s| {
        s.experiment == candidate.experiment
            && s.mod_time == candidate.mod_time
            && s.file_size == candidate.file_size
    })
}

/// Build or refresh the catalog at `db` from `roots` without progress output.
pub fn build_index(db: &Database, roots: &[PathBuf], options: IndexOptions) -> Result<IndexReport> {
    IndexService::new(db, roots.to_vec(), options).run(|_| {})
}
