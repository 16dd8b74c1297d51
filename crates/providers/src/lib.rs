//! Metadata provider abstractions.
//!
//! A provider answers one question: given a directory and a file name inside
//! it, which named metadata fields does that file carry? Everything the
//! triage needs (the rating label in particular) is read through this seam.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "exif")]
pub mod exif;
pub mod xmp;

/// Field name to value. Only non-empty values are present.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation} '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed metadata in '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

pub trait MetadataProvider: Send + Sync {
    /// Reads the metadata of `file`, a name inside `dir`. The name is taken
    /// as the file system returns it and need not be valid UTF-8.
    fn read(&self, dir: &Path, file: &OsStr) -> Result<Metadata, ProviderError>;
}

/// Labels a provider writes into the rating column, indexed by star count.
///
/// Shell providers display a localized label rather than the stored number;
/// the portable providers mimic that so the vocabulary lookup sees the same
/// kind of value whichever provider produced it.
#[derive(Debug, Clone)]
pub struct RatingColumn {
    pub field: String,
    pub labels: BTreeMap<u8, String>,
}

impl RatingColumn {
    pub fn new(field: impl Into<String>, labels: BTreeMap<u8, String>) -> Self {
        Self {
            field: field.into(),
            labels,
        }
    }

    /// Renders a raw stored rating. Missing or negative ratings read as
    /// "unrated" (0); a rating without a label is passed through verbatim.
    pub fn render(&self, raw: Option<&str>) -> Option<String> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        let stars = match raw {
            None => 0,
            Some(text) => match text.parse::<i64>() {
                Ok(n) if n <= 0 => 0,
                Ok(n) => match u8::try_from(n) {
                    Ok(n) => n,
                    Err(_) => return Some(text.to_string()),
                },
                Err(_) => return Some(text.to_string()),
            },
        };
        match self.labels.get(&stars) {
            Some(label) => Some(label.clone()),
            None => raw.map(str::to_string).or_else(|| Some(stars.to_string())),
        }
    }

    pub fn insert_into(&self, fields: &mut Metadata, raw: Option<&str>) {
        if let Some(value) = self.render(raw).filter(|v| !v.is_empty()) {
            fields.insert(self.field.clone(), value);
        }
    }
}

/// Adds the file-system columns every provider reports.
pub(crate) fn insert_basic_fields(
    fields: &mut Metadata,
    path: &Path,
    file: &OsStr,
) -> Result<(), ProviderError> {
    let meta = std::fs::metadata(path).map_err(|source| ProviderError::Io {
        operation: "stat",
        path: path.to_path_buf(),
        source,
    })?;
    if !file.is_empty() {
        fields.insert("Name".to_string(), file.to_string_lossy().into_owned());
    }
    fields.insert("Size".to_string(), meta.len().to_string());
    Ok(())
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    metadata: HashMap<String, Arc<dyn MetadataProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, name: &str, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata.insert(name.to_string(), provider);
        self
    }

    pub fn metadata(&self, name: &str) -> Result<Arc<dyn MetadataProvider>, ProviderError> {
        self.metadata
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metadata.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> RatingColumn {
        let labels = [(0u8, "Unrated"), (1, "1 star"), (5, "5 stars")]
            .into_iter()
            .map(|(n, l)| (n, l.to_string()))
            .collect();
        RatingColumn::new("Rating", labels)
    }

    #[test]
    fn render_uses_labels() {
        let col = column();
        assert_eq!(col.render(Some("5")).as_deref(), Some("5 stars"));
        assert_eq!(col.render(Some(" 1 ")).as_deref(), Some("1 star"));
    }

    #[test]
    fn missing_and_rejected_read_as_unrated() {
        let col = column();
        assert_eq!(col.render(None).as_deref(), Some("Unrated"));
        assert_eq!(col.render(Some("-1")).as_deref(), Some("Unrated"));
    }

    #[test]
    fn unlabelled_rating_passes_through() {
        let col = column();
        assert_eq!(col.render(Some("3")).as_deref(), Some("3"));
        assert_eq!(col.render(Some("seven")).as_deref(), Some("seven"));
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let reg = ProviderRegistry::new();
        assert!(matches!(
            reg.metadata("shell"),
            Err(ProviderError::UnknownProvider(name)) if name == "shell"
        ));
    }
}
