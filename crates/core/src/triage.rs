//! Walks the source tree, reads each file's rating and copies the keepers.

use crate::config::{Settings, UnknownRatingPolicy};
use crate::copy::{copy_preserving, verify_copy};
use crate::error::TriageError;
use crate::models::{Decision, FileEntry, TriageSummary};
use providers::MetadataProvider;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Observer for the file loop. The CLI draws a progress bar with it.
pub trait Progress {
    fn begin(&self, _total: u64) {}
    fn advance(&self, _path: &Path) {}
    fn finish(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Copy,
    DryRun,
}

/// Lists every file under `root` exactly once, sorted by name within each
/// folder. Links are reported as files and never followed.
pub fn walk(root: &Path) -> Result<Vec<FileEntry>, TriageError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| TriageError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.into_path();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        entries.push(FileEntry { path, relative });
    }
    Ok(entries)
}

/// Decides the fate of one file; copies it in `Mode::Copy`.
pub fn process_file(
    settings: &Settings,
    provider: &dyn MetadataProvider,
    entry: &FileEntry,
    mode: Mode,
) -> Result<(Decision, u64), TriageError> {
    if settings.exclude.is_match(&entry.relative) {
        debug!("excluded {}", entry.relative.display());
        return Ok((Decision::Excluded, 0));
    }

    let metadata = provider
        .read(entry.dir(), entry.file_name())
        .map_err(|source| TriageError::Metadata {
            path: entry.path.clone(),
            source,
        })?;
    let rating = match settings
        .rating
        .vocabulary
        .rating_of(&metadata, &settings.rating.rating_field)
    {
        Ok(r) => r,
        Err(source) => match settings.on_unknown_rating {
            UnknownRatingPolicy::Abort => {
                return Err(TriageError::Rating {
                    path: entry.path.clone(),
                    source,
                })
            }
            UnknownRatingPolicy::Skip => {
                warn!("skipping {}: {}", entry.path.display(), source);
                return Ok((Decision::UnknownRating, 0));
            }
        },
    };

    if rating < settings.min_rating {
        debug!("{} rated {}, below threshold", entry.relative.display(), rating);
        return Ok((Decision::BelowThreshold, 0));
    }

    let target = entry.destination(&settings.output);
    if mode == Mode::DryRun {
        debug!("would copy {} (rated {})", entry.relative.display(), rating);
        return Ok((Decision::Copied, file_len(&entry.path)));
    }
    let bytes = copy_preserving(&entry.path, &target)?;
    if settings.verify {
        verify_copy(&entry.path, &target)?;
    }
    debug!("copied {} (rated {})", entry.relative.display(), rating);
    Ok((Decision::Copied, bytes))
}

/// Runs the whole file loop. The first error stops the run; files already
/// copied stay where they are.
pub fn triage(
    settings: &Settings,
    provider: &dyn MetadataProvider,
    progress: &dyn Progress,
    mode: Mode,
) -> Result<TriageSummary, TriageError> {
    let entries = walk(&settings.input)?;
    progress.begin(entries.len() as u64);

    let mut summary = TriageSummary::default();
    for entry in &entries {
        progress.advance(&entry.path);
        let (decision, bytes) = process_file(settings, provider, entry, mode)?;
        summary.record(entry, decision, bytes);
    }
    progress.finish();
    Ok(summary)
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or_default()
}
