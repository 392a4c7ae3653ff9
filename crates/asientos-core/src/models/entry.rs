//! Registry entry ("asiento registral") data model.

use serde::{Deserialize, Serialize};

/// One structured record describing a dated inscription event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// The matched inscription/date clause.
    pub inscription_record: String,

    /// Reference/book clause ("Libro de Títulos", "Referencia / Origen").
    pub origin_reference: Option<String>,

    /// 9-digit identifier, or a similarity annotation on synthetic entries.
    pub identification: Option<String>,

    /// Free text accumulated once identification is known.
    pub description: Option<String>,

    /// Set when the target clause was detected by fuzzy matching only.
    #[serde(default)]
    pub is_similarity_match: bool,
}

impl RegistryEntry {
    /// Start an entry from its inscription clause.
    pub fn new(inscription_record: impl Into<String>) -> Self {
        Self {
            inscription_record: inscription_record.into(),
            origin_reference: None,
            identification: None,
            description: None,
            is_similarity_match: false,
        }
    }

    pub fn has_identification(&self) -> bool {
        self.identification.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn has_reference(&self) -> bool {
        self.origin_reference.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Append a continuation paragraph to the description.
    pub fn append_description(&mut self, paragraph: &str) {
        match &mut self.description {
            Some(description) => {
                description.push('\n');
                description.push_str(paragraph);
            }
            None => self.description = Some(paragraph.to_string()),
        }
    }
}

/// Serialize an entry list as a pretty JSON array.
pub fn entries_to_json(entries: &[RegistryEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialized_field_names() {
        let mut entry = RegistryEntry::new("Inscrito el: 01/02/2020");
        entry.identification = Some("123456789".to_string());

        let value = serde_json::to_value(&entry).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "description",
                "identification",
                "inscriptionRecord",
                "isSimilarityMatch",
                "originReference",
            ]
        );
        assert_eq!(obj["identification"], "123456789");
    }

    #[test]
    fn test_empty_list_is_array() {
        assert_eq!(entries_to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_append_description() {
        let mut entry = RegistryEntry::new("Inscrito");
        entry.append_description("first");
        entry.append_description("second");
        assert_eq!(entry.description.as_deref(), Some("first\nsecond"));
    }
}
