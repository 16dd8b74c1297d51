use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A file discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path exactly as the walk returned it.
    pub path: PathBuf,
    /// Path relative to the source root; mirrored under the destination.
    pub relative: PathBuf,
}

impl FileEntry {
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }

    pub fn destination(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.relative)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Copied,
    BelowThreshold,
    UnknownRating,
    Excluded,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageSummary {
    pub visited: usize,
    pub copied: usize,
    pub below_threshold: usize,
    pub unknown_rating: usize,
    pub excluded: usize,
    pub bytes_copied: u64,
    pub copied_paths: Vec<String>,
}

impl TriageSummary {
    pub fn record(&mut self, entry: &FileEntry, decision: Decision, bytes: u64) {
        match decision {
            Decision::Excluded => {
                self.excluded += 1;
                return;
            }
            Decision::Copied => {
                self.copied += 1;
                self.bytes_copied += bytes;
                self.copied_paths
                    .push(entry.relative.to_string_lossy().replace('\\', "/"));
            }
            Decision::BelowThreshold => self.below_threshold += 1,
            Decision::UnknownRating => self.unknown_rating += 1,
        }
        self.visited += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanReport {
    pub removed: usize,
    pub failures: Vec<CleanFailure>,
}
