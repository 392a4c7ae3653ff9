//! Paragraph state machine assembling registry entries.

use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::entry::RegistryEntry;

use super::fields::{FieldExtractor, IdentificationField, InscriptionField, ReferenceField};
use super::fuzzy::{FuzzyMatcher, PhraseMatch};
use super::normalize::TextNormalizer;
use super::patterns::{PARAGRAPH_BREAK, TARGET_CLAUSE_PATTERN};
use super::{PageExtraction, Result};

const PARTIAL_INSCRIPTION: &str = "Inscrito el: [Fecha extraída parcialmente]";
const PARTIAL_REFERENCE: &str = "Libro de Títulos [Extraído parcialmente]";
const PARTIAL_IDENTIFICATION: &str = "[ID Parcial]";
const TARGET_CLAUSE_DESCRIPTION: &str = "HIPOTECA CONVENCIONAL EN PRIMER RANGO, a favor de BANCO DE RESERVAS DE LA REPÚBLICA DOMINICANA. El derecho tiene su origen en documento de fecha [Extraído parcialmente].";

/// Builds registry entries from page text.
#[derive(Debug, Clone)]
pub struct EntryExtractor {
    normalizer: TextNormalizer,
    matcher: FuzzyMatcher,
    fallback_entry: bool,
}

/// Mutable state threaded through the paragraph loop.
#[derive(Debug, Default)]
struct EntryBuilder {
    current: Option<RegistryEntry>,
    entries: Vec<RegistryEntry>,
}

impl EntryBuilder {
    fn feed(&mut self, paragraph: &str) {
        if let Some(inscription) = InscriptionField.extract(paragraph) {
            self.finalize();

            let mut entry = RegistryEntry::new(inscription);
            entry.origin_reference = ReferenceField.extract(paragraph);
            self.current = Some(entry);
            return;
        }

        let Some(entry) = self.current.as_mut() else {
            return;
        };

        if !entry.has_identification() {
            if let Some(id) = IdentificationField.extract(paragraph) {
                entry.identification = Some(id);
                entry.description = Some(paragraph.trim().to_string());
                return;
            }
        } else {
            entry.append_description(paragraph.trim());
            return;
        }

        if !entry.has_reference() {
            if let Some(reference) = ReferenceField.extract(paragraph) {
                entry.origin_reference = Some(reference);
            }
        }
    }

    fn finalize(&mut self) {
        if let Some(entry) = self.current.take() {
            self.entries.push(entry);
        }
    }

    fn finish(mut self) -> Vec<RegistryEntry> {
        self.finalize();
        self.entries
    }
}

impl EntryExtractor {
    /// Create an extractor from the extraction configuration.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(),
            matcher: FuzzyMatcher::from_config(config)?,
            fallback_entry: config.fallback_entry,
        })
    }

    /// Enable or disable the synthetic entry for detected-but-unparsed clauses.
    pub fn with_fallback_entry(mut self, enabled: bool) -> Self {
        self.fallback_entry = enabled;
        self
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Normalize raw page text, then extract entries.
    pub fn extract(&self, text: &str) -> PageExtraction {
        let normalized = self.normalizer.normalize(text);
        self.extract_normalized(&normalized)
    }

    /// Extract entries from already-normalized page text.
    pub fn extract_normalized(&self, text: &str) -> PageExtraction {
        let exact_match = TARGET_CLAUSE_PATTERN.is_match(text);
        let PhraseMatch {
            matched: fuzzy_match,
            similarity: best_similarity,
        } = self.matcher.best_match(text);

        if fuzzy_match {
            info!("Target clause found by similarity ({:.2}%)", best_similarity);
        } else if exact_match {
            info!("Target clause found (exact)");
        } else {
            debug!(
                "Best target similarity {:.2}% below {:.2}%",
                best_similarity,
                self.matcher.threshold()
            );
        }

        let mut builder = EntryBuilder::default();
        for paragraph in PARAGRAPH_BREAK.split(text) {
            builder.feed(paragraph);
        }
        let mut entries = builder.finish();

        debug!("Paragraph scan produced {} entries", entries.len());

        if entries.is_empty() && (exact_match || fuzzy_match) && self.fallback_entry {
            info!("No structured entry parsed; emitting entry for detected target clause");
            entries.push(synthetic_entry(exact_match, fuzzy_match, best_similarity));
        }

        PageExtraction {
            entries,
            exact_match,
            fuzzy_match,
            best_similarity,
        }
    }
}

impl Default for EntryExtractor {
    fn default() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            matcher: FuzzyMatcher::default(),
            fallback_entry: true,
        }
    }
}

fn synthetic_entry(exact_match: bool, fuzzy_match: bool, similarity: f64) -> RegistryEntry {
    let fuzzy_only = fuzzy_match && !exact_match;

    let identification = if fuzzy_only {
        format!("Similitud: {:.2}%", similarity)
    } else {
        PARTIAL_IDENTIFICATION.to_string()
    };

    RegistryEntry {
        inscription_record: PARTIAL_INSCRIPTION.to_string(),
        origin_reference: Some(PARTIAL_REFERENCE.to_string()),
        identification: Some(identification),
        description: Some(TARGET_CLAUSE_DESCRIPTION.to_string()),
        is_similarity_match: fuzzy_only,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(paragraphs: &[&str]) -> PageExtraction {
        EntryExtractor::default().extract(&paragraphs.join("\n"))
    }

    #[test]
    fn test_single_entry_with_continuation() {
        let result = extract(&[
            "Inscrito el: 01/02/2020",
            "No. 123456789 Hipoteca a favor de BANCO DE RESERVAS",
            "continuación de texto",
        ]);

        assert_eq!(
            result.entries,
            vec![RegistryEntry {
                inscription_record: "Inscrito el: 01/02/2020".to_string(),
                origin_reference: None,
                identification: Some("123456789".to_string()),
                description: Some(
                    "No. 123456789 Hipoteca a favor de BANCO DE RESERVAS\ncontinuación de texto"
                        .to_string()
                ),
                is_similarity_match: false,
            }]
        );
        assert!(result.exact_match);
    }

    #[test]
    fn test_exact_clause_without_structure_yields_synthetic_entry() {
        let result = extract(&[
            "CERTIFICACIÓN DE ESTADO JURÍDICO",
            "Hipoteca a favor de BANCO RESERVAS",
        ]);

        assert!(result.exact_match);
        assert_eq!(result.entries.len(), 1);

        let entry = &result.entries[0];
        assert!(!entry.is_similarity_match);
        assert_eq!(entry.inscription_record, PARTIAL_INSCRIPTION);
        assert_eq!(entry.origin_reference.as_deref(), Some(PARTIAL_REFERENCE));
        assert_eq!(entry.identification.as_deref(), Some(PARTIAL_IDENTIFICATION));
        assert_eq!(entry.description.as_deref(), Some(TARGET_CLAUSE_DESCRIPTION));
    }

    #[test]
    fn test_fuzzy_only_clause_marks_similarity() {
        let result = extract(&["HIPOTECA A FAVOR DEL BANC0 DE RESERVAS"]);

        assert!(!result.exact_match);
        assert!(result.fuzzy_match);
        let entry = &result.entries[0];
        assert!(entry.is_similarity_match);
        assert_eq!(
            entry.identification,
            Some(format!("Similitud: {:.2}%", result.best_similarity))
        );
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let result = EntryExtractor::default()
            .with_fallback_entry(false)
            .extract("a favor de BANCO RESERVAS");
        assert!(result.target_detected());
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_no_fallback_when_structured_entry_exists() {
        let result = extract(&[
            "Inscrito el: 01/02/2020",
            "texto sin número",
            "A FAVOR DEL BANC0 DE RESERVAS",
        ]);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].inscription_record, "Inscrito el: 01/02/2020");
        assert!(!result.entries[0].is_similarity_match);
    }

    #[test]
    fn test_multiple_entries_and_references() {
        let result = extract(&[
            "preámbulo ignorado",
            "Inscrito el: 12/05/2019 - 10:30 AM Libro de Títulos: 0123",
            "Identificación 402123456 hipoteca",
            "segunda línea",
            "Inscrito 01/02/2020",
            "Libro No. 77",
            "Número 001987654 venta",
        ]);

        assert_eq!(result.entries.len(), 2);

        let first = &result.entries[0];
        assert_eq!(first.inscription_record, "Inscrito el: 12/05/2019 - 10:30 AM");
        assert_eq!(first.origin_reference.as_deref(), Some("0123"));
        assert_eq!(first.identification.as_deref(), Some("402123456"));
        assert_eq!(
            first.description.as_deref(),
            Some("Identificación 402123456 hipoteca\nsegunda línea")
        );

        let second = &result.entries[1];
        assert_eq!(second.origin_reference.as_deref(), Some("77"));
        assert_eq!(second.identification.as_deref(), Some("001987654"));
        assert_eq!(second.description.as_deref(), Some("Número 001987654 venta"));
    }

    #[test]
    fn test_paragraphs_before_identification_are_dropped() {
        let result = extract(&["Inscrito 01/02/2020", "sin datos", "más texto"]);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].description, None);
        assert_eq!(result.entries[0].identification, None);
    }

    #[test]
    fn test_empty_text() {
        let result = extract(&[]);
        assert!(result.entries.is_empty());
        assert!(!result.target_detected());
    }
}
