//! Core library: configuration, rating vocabulary, destination cleaning and
//! the rating-filtered copy of a photo tree.

pub mod cleaner;
pub mod config;
pub mod copy;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rating;
pub mod triage;

pub use error::TriageError;
