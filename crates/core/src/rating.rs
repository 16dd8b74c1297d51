//! Star-rating vocabulary: textual labels to ratings 0..=5.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub const MAX_RATING: u8 = 5;

/// Labels shown by a French Windows shell in the "Notation" column.
const FRENCH_SHELL_LABELS: [(&str, u8); 6] = [
    ("Non classé", 0),
    ("1 étoile", 1),
    ("2 étoiles", 2),
    ("3 étoiles", 3),
    ("4 étoiles", 4),
    ("5 étoiles", 5),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("rating field '{0}' is absent")]
    MissingField(String),
    #[error("unknown rating label '{0}'")]
    UnknownLabel(String),
    #[error("rating {rating} for label '{label}' is outside 0..=5")]
    OutOfRange { label: String, rating: i64 },
    #[error("label '{0}' is listed twice")]
    DuplicateLabel(String),
}

/// One `{label, rating}` row of a configured vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: String,
    pub rating: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingVocabulary {
    labels: HashMap<String, u8>,
}

impl Default for RatingVocabulary {
    fn default() -> Self {
        Self {
            labels: FRENCH_SHELL_LABELS
                .iter()
                .map(|(label, rating)| (label.to_string(), *rating))
                .collect(),
        }
    }
}

impl RatingVocabulary {
    pub fn from_entries(entries: &[LabelEntry]) -> Result<Self, RatingError> {
        let mut labels = HashMap::with_capacity(entries.len());
        for entry in entries {
            let rating = u8::try_from(entry.rating)
                .ok()
                .filter(|r| *r <= MAX_RATING)
                .ok_or_else(|| RatingError::OutOfRange {
                    label: entry.label.clone(),
                    rating: entry.rating,
                })?;
            if labels.insert(entry.label.clone(), rating).is_some() {
                return Err(RatingError::DuplicateLabel(entry.label.clone()));
            }
        }
        Ok(Self { labels })
    }

    /// Exact match only: labels are compared verbatim, case and accents
    /// included.
    pub fn lookup(&self, label: &str) -> Result<u8, RatingError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| RatingError::UnknownLabel(label.to_string()))
    }

    /// Rating of the `field` entry of a metadata map.
    pub fn rating_of(
        &self,
        metadata: &BTreeMap<String, String>,
        field: &str,
    ) -> Result<u8, RatingError> {
        let label = metadata
            .get(field)
            .ok_or_else(|| RatingError::MissingField(field.to_string()))?;
        self.lookup(label)
    }

    /// First label (alphabetically) for each rating; what providers render.
    pub fn labels_by_rating(&self) -> BTreeMap<u8, String> {
        let mut out: BTreeMap<u8, String> = BTreeMap::new();
        for (label, rating) in &self.labels {
            match out.get(rating) {
                Some(existing) if existing <= label => {}
                _ => {
                    out.insert(*rating, label.clone());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
