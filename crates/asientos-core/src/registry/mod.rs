//! Registry entry extraction: text cleanup, target-clause detection and
//! the paragraph state machine.

mod extractor;
pub mod fields;
mod fuzzy;
mod normalize;
pub mod patterns;

pub use extractor::EntryExtractor;
pub use fields::{FieldExtractor, IdentificationField, InscriptionField, ReferenceField};
pub use fuzzy::{levenshtein, FuzzyMatcher, PhraseMatch};
pub use normalize::TextNormalizer;

use serde::Serialize;

use crate::error::ExtractionError;
use crate::models::entry::RegistryEntry;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Entries and target-clause signals for one page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageExtraction {
    pub entries: Vec<RegistryEntry>,
    /// The exact target-clause pattern matched.
    pub exact_match: bool,
    /// Some fuzzy window reached the similarity threshold.
    pub fuzzy_match: bool,
    /// Best fuzzy similarity seen, in percent.
    pub best_similarity: f64,
}

impl PageExtraction {
    pub fn target_detected(&self) -> bool {
        self.exact_match || self.fuzzy_match
    }
}
