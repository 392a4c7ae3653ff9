//! Field extractors for the clauses of a registry entry.

use super::patterns::{IDENTIFICATION_PATTERN, INSCRIPTION_PATTERN, REFERENCE_PATTERN};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// Extract the first occurrence of the field.
    fn extract(&self, text: &str) -> Option<String>;
}

/// Dated inscription clause ("Inscrito el: 12/05/2019 - 10:30 AM").
///
/// Yields the whole clause, trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InscriptionField;

/// Reference/origin clause; yields the rest of the line after the label.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceField;

/// 9-digit identification number following its label.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentificationField;

impl FieldExtractor for InscriptionField {
    fn extract(&self, text: &str) -> Option<String> {
        INSCRIPTION_PATTERN
            .find(text)
            .map(|m| m.as_str().trim().to_string())
    }
}

impl FieldExtractor for ReferenceField {
    fn extract(&self, text: &str) -> Option<String> {
        REFERENCE_PATTERN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            // A bare label carries no reference
            .find(|reference| !reference.is_empty())
            .map(str::to_string)
    }
}

impl FieldExtractor for IdentificationField {
    fn extract(&self, text: &str) -> Option<String> {
        IDENTIFICATION_PATTERN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}
