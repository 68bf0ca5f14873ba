//! Reference vocabulary and the "no matching concept" sentinel.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TableType;

/// Concept id substituted for ids absent from the reference vocabulary.
pub const NO_MATCHING_CONCEPT_ID: &str = "0";
/// Concept name paired with [`NO_MATCHING_CONCEPT_ID`].
pub const NO_MATCHING_CONCEPT_NAME: &str = "No Matching Concept";

/// Read-only `concept_id -> concept_name` lookup.
///
/// Ids are kept as strings so large ids and leading characters survive
/// loading unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConceptReference {
    names: HashMap<String, String>,
}

impl ConceptReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut reference = Self::new();
        for (id, name) in pairs {
            reference.insert(id.as_ref(), name);
        }
        reference
    }

    /// Adds a concept; the first name loaded for an id is kept.
    pub fn insert(&mut self, concept_id: &str, concept_name: impl Into<String>) {
        let Some(id) = normalize_concept_id(concept_id) else {
            return;
        };
        self.names.entry(id).or_insert_with(|| concept_name.into());
    }

    pub fn contains(&self, concept_id: &str) -> bool {
        normalize_concept_id(concept_id).is_some_and(|id| self.names.contains_key(&id))
    }

    pub fn name(&self, concept_id: &str) -> Option<&str> {
        let id = normalize_concept_id(concept_id)?;
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Canonical text form of a concept id.
///
/// Trims whitespace and drops the `.0` suffix that float-typed producer
/// columns leave behind. Returns `None` for empty input.
pub fn normalize_concept_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = trimmed
        .strip_suffix(".0")
        .filter(|head| !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(trimmed);
    Some(stripped.to_string())
}

/// A concept id that was replaced by the sentinel, with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedConcept {
    pub table: TableType,
    pub column: String,
    pub value: String,
    pub count: usize,
}
