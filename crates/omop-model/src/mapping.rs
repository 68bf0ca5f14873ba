use serde::{Deserialize, Serialize};

/// One entry of a source-field mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMapping {
    /// Coded value as it appears in the source export.
    pub source_value: String,
    pub concept_id: String,
    pub concept_name: String,
    /// Human-readable label carried into `*_source_value` columns.
    pub source_label: String,
}

/// Result of looking up a source value in a [`ValueMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptLookup<'a> {
    Known(&'a ConceptMapping),
    Unknown,
}

impl<'a> ConceptLookup<'a> {
    pub fn known(self) -> Option<&'a ConceptMapping> {
        match self {
            ConceptLookup::Known(mapping) => Some(mapping),
            ConceptLookup::Unknown => None,
        }
    }
}

/// Ordered mapping table for a single source field.
///
/// Lookups are exact matches on the trimmed source value; there is no
/// implicit default, callers handle [`ConceptLookup::Unknown`] explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMap {
    pub field: String,
    pub entries: Vec<ConceptMapping>,
}

impl ValueMap {
    pub fn new<I>(field: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, &'static str, &'static str, &'static str)>,
    {
        Self {
            field: field.into(),
            entries: entries
                .into_iter()
                .map(
                    |(source_value, concept_id, concept_name, source_label)| ConceptMapping {
                        source_value: source_value.to_string(),
                        concept_id: concept_id.to_string(),
                        concept_name: concept_name.to_string(),
                        source_label: source_label.to_string(),
                    },
                )
                .collect(),
        }
    }

    pub fn lookup(&self, source_value: &str) -> ConceptLookup<'_> {
        let needle = source_value.trim();
        self.entries
            .iter()
            .find(|entry| entry.source_value == needle)
            .map_or(ConceptLookup::Unknown, ConceptLookup::Known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> ValueMap {
        ValueMap::new(
            "weightu",
            [
                ("1", "8739", "pound (US)", "lb"),
                ("2", "9529", "kilogram", "kg"),
            ],
        )
    }

    #[test]
    fn exact_match_only() {
        let map = units();
        let kg = map.lookup(" 2 ").known().expect("kilogram entry");
        assert_eq!(kg.concept_id, "9529");
        assert_eq!(kg.source_label, "kg");
        assert_eq!(map.lookup("2.5"), ConceptLookup::Unknown);
        assert_eq!(map.lookup(""), ConceptLookup::Unknown);
    }

    #[test]
    fn entries_keep_declaration_order() {
        let map = units();
        let order: Vec<&str> = map.entries.iter().map(|e| e.source_value.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);
    }
}
