use crate::cleaner;
use crate::config::{ConfigError, RatingSource, Settings};
use crate::error::TriageError;
use crate::models::{CleanReport, TriageSummary};
use crate::triage::{self, Mode, Progress};
use chrono::{DateTime, Utc};
use providers::xmp::XmpProvider;
use providers::{MetadataProvider, ProviderRegistry, RatingColumn};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub clean: CleanReport,
    pub triage: TriageSummary,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The confirmation was refused; nothing was touched.
    Declined { pending: usize },
    Completed(RunSummary),
}

/// Confirm, clean the destination, then copy every file rated at or above
/// the threshold.
///
/// `confirm` receives the number of files about to be deleted.
pub fn run(
    settings: &Settings,
    provider: &dyn MetadataProvider,
    confirm: impl FnOnce(usize) -> bool,
    progress: &dyn Progress,
) -> Result<RunOutcome, TriageError> {
    let started_at = Utc::now();
    info!(
        "Copying images rated {} or higher from {} to {}",
        settings.min_rating,
        settings.input.display(),
        settings.output.display()
    );

    let pending = cleaner::count_files(&settings.output)?;
    if !confirm(pending) {
        info!("Cleanup declined, nothing changed");
        return Ok(RunOutcome::Declined { pending });
    }

    info!("Starting clean phase...");
    let clean = cleaner::empty_folder(&settings.output, settings.clean_method)?;

    info!("Starting copy phase...");
    let triage = triage::triage(settings, provider, progress, Mode::Copy)?;
    info!(
        "Copy complete. {} of {} files copied.",
        triage.copied, triage.visited
    );

    Ok(RunOutcome::Completed(RunSummary {
        started_at,
        finished_at: Utc::now(),
        clean,
        triage,
    }))
}

/// Same decisions as [`run`] without cleaning or copying anything.
pub fn plan(
    settings: &Settings,
    provider: &dyn MetadataProvider,
    progress: &dyn Progress,
) -> Result<TriageSummary, TriageError> {
    info!("Starting dry run...");
    triage::triage(settings, provider, progress, Mode::DryRun)
}

pub fn build_registry(source: &RatingSource) -> ProviderRegistry {
    let column = RatingColumn::new(
        source.rating_field.clone(),
        source.vocabulary.labels_by_rating(),
    );
    let reg = ProviderRegistry::new();
    #[cfg(feature = "exif")]
    let reg = reg.with_metadata(
        "exif",
        Arc::new(providers::exif::ExifProvider::new(column.clone())),
    );
    reg.with_metadata("xmp", Arc::new(XmpProvider::new(column)))
}

/// Provider named by `metadata.provider`.
pub fn select_provider(source: &RatingSource) -> Result<Arc<dyn MetadataProvider>, ConfigError> {
    let registry = build_registry(source);
    registry
        .metadata(&source.provider)
        .map_err(|_| ConfigError::UnknownProvider {
            name: source.provider.clone(),
            available: registry.names().join(", "),
        })
}
