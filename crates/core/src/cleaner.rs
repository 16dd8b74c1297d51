//! Empties the destination folder before a run.

use crate::config::CleanMethod;
use crate::error::TriageError;
use crate::models::{CleanFailure, CleanReport};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Counts every non-directory entry below `dir`, links included.
pub fn count_files(dir: &Path) -> Result<usize, TriageError> {
    let mut count = 0;
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|source| TriageError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            count += 1;
        }
    }
    Ok(count)
}

/// Removes everything inside `dir` and leaves `dir` itself in place.
///
/// A failure on one entry is logged and recorded in the report; the
/// remaining entries are still processed. Only listing `dir` itself is fatal.
pub fn empty_folder(dir: &Path, method: CleanMethod) -> Result<CleanReport, TriageError> {
    empty_folder_with(dir, |path| remove_entry(path, method))
}

fn empty_folder_with(
    dir: &Path,
    mut remove: impl FnMut(&Path) -> Result<(), String>,
) -> Result<CleanReport, TriageError> {
    let mut report = CleanReport::default();
    let entries = fs::read_dir(dir).map_err(TriageError::io("list", dir))?;
    for entry in entries {
        let path = match entry {
            Ok(e) => e.path(),
            Err(e) => {
                warn!("Failed to read an entry of {}. Reason: {}", dir.display(), e);
                report.failures.push(CleanFailure {
                    path: dir.to_string_lossy().into_owned(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match remove(&path) {
            Ok(()) => report.removed += 1,
            Err(reason) => {
                warn!("Failed to delete {}. Reason: {}", path.display(), reason);
                report.failures.push(CleanFailure {
                    path: path.to_string_lossy().into_owned(),
                    reason,
                });
            }
        }
    }
    info!(
        "Cleaned {}: {} entries removed, {} failures",
        dir.display(),
        report.removed,
        report.failures.len()
    );
    Ok(report)
}

fn remove_entry(path: &Path, method: CleanMethod) -> Result<(), String> {
    if method == CleanMethod::Trash {
        return trash::delete(path).map_err(|e| e.to_string());
    }
    // symlink_metadata so links are unlinked rather than followed.
    let meta = fs::symlink_metadata(path).map_err(|e| e.to_string())?;
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        remove_file_or_link(path)
    };
    result.map_err(|e| e.to_string())
}

#[cfg(windows)]
fn remove_file_or_link(path: &Path) -> std::io::Result<()> {
    // Directory symlinks and junctions need remove_dir on Windows.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_file_or_link(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path)
}
