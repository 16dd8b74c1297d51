use crate::rating::RatingError;
use providers::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that halt a triage run.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("walking '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("reading metadata of '{}': {source}", path.display())]
    Metadata {
        path: PathBuf,
        source: ProviderError,
    },

    #[error("'{}': {source}", path.display())]
    Rating { path: PathBuf, source: RatingError },

    #[error("{operation} '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("copy of '{}' does not match its source", path.display())]
    VerifyMismatch { path: PathBuf },
}

impl TriageError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| TriageError::Io {
            operation,
            path,
            source,
        }
    }
}
