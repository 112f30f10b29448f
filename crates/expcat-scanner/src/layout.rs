//! Discovery of catalog candidates in a `configuration/experiment/output_dir/*.nc`
//! tree. Only directory entries and file metadata are touched here.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use walkdir::WalkDir;

use crate::Result;

/// Depth of netCDF files below the root.
pub const FILE_DEPTH: usize = 4;

/// A netCDF file found at the expected depth, not yet opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub configuration: String,
    pub experiment: String,
    pub output_dir: String,
    /// Directory holding the experiment's output directories.
    pub experiment_dir: PathBuf,
    /// RFC 3339 with nanoseconds, so sub-second rewrites are noticed.
    pub mod_time: String,
    pub file_size: i64,
}

impl FileCandidate {
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Lazy walk over one root. Calling [`candidates`] again restarts the walk.
pub struct CandidateIter {
    walker: walkdir::IntoIter,
}

/// Enumerate `*.nc` files under `root` in a stable (name-sorted) order.
pub fn candidates(root: &Path, follow_symlinks: bool) -> CandidateIter {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(FILE_DEPTH)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter();
    CandidateIter { walker }
}

impl Iterator for CandidateIter {
    type Item = Result<FileCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err.into())),
            };

            if !entry.file_type().is_file() || !is_netcdf_name(entry.path()) {
                continue;
            }

            if entry.depth() != FILE_DEPTH {
                tracing::debug!(
                    path = %entry.path().display(),
                    depth = entry.depth(),
                    "skipping netCDF file outside configuration/experiment/output layout"
                );
                continue;
            }

            return Some(candidate_from_entry(&entry));
        }
    }
}

fn is_netcdf_name(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "nc")
}

fn candidate_from_entry(entry: &walkdir::DirEntry) -> Result<FileCandidate> {
    let path = entry.path().to_path_buf();
    let metadata = entry.metadata()?;

    let output_dir_path = path.parent().unwrap_or(Path::new(""));
    let experiment_dir = output_dir_path.parent().unwrap_or(Path::new(""));
    let configuration_dir = experiment_dir.parent().unwrap_or(Path::new(""));

    Ok(FileCandidate {
        configuration: file_name(configuration_dir),
        experiment: file_name(experiment_dir),
        output_dir: file_name(output_dir_path),
        experiment_dir: experiment_dir.to_path_buf(),
        mod_time: format_mod_time(metadata.modified()?),
        file_size: metadata.len() as i64,
        path,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn format_mod_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Current modification time of `path` in catalog format.
pub fn current_mod_time(path: &Path) -> Option<String> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(format_mod_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"CDF\x01").unwrap();
    }

    #[test]
    fn test_only_files_at_layout_depth_are_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "cfg/exp/output000/ocean.nc");
        touch(dir.path(), "cfg/exp/output001/ocean.nc");
        touch(dir.path(), "cfg/exp/stray.nc");
        touch(dir.path(), "cfg/exp/output000/restart/ocean.nc");
        touch(dir.path(), "cfg/exp/output000/notes.txt");

        let found: Vec<FileCandidate> = candidates(dir.path(), false)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].configuration, "cfg");
        assert_eq!(found[0].experiment, "exp");
        assert_eq!(found[0].output_dir, "output000");
        assert_eq!(found[1].output_dir, "output001");
        assert_eq!(found[0].experiment_dir, dir.path().join("cfg/exp"));
        assert_eq!(found[0].file_size, 4);
    }

    #[test]
    fn test_mod_time_has_nanosecond_precision() {
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::new(1, 5);
        assert_eq!(format_mod_time(t), "1970-01-01T00:00:01.000000005Z");
    }
}
