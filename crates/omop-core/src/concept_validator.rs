//! Concept id validation against the reference vocabulary.

use std::collections::BTreeMap;

use omop_model::{
    ConceptReference, NO_MATCHING_CONCEPT_ID, NO_MATCHING_CONCEPT_NAME, UnresolvedConcept,
    normalize_concept_id,
};
use tracing::warn;

use crate::error::Result;
use crate::frame::{OmopFrame, set_string_column, string_values};

const CONCEPT_ID_SUFFIX: &str = "_concept_id";
const CONCEPT_NAME_SUFFIX: &str = "_concept_name";

/// Result of validating one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptValidation {
    /// One entry per distinct `(column, value)`, in column then value order.
    pub unresolved: Vec<UnresolvedConcept>,
    /// Number of id cells replaced by the sentinel.
    pub replaced_cells: usize,
}

/// `(id column, paired name column)` for every concept column of the frame.
fn concept_columns(frame: &OmopFrame) -> Vec<(String, Option<String>)> {
    let names = frame.column_names();
    names
        .iter()
        .filter_map(|name| {
            let prefix = name.strip_suffix(CONCEPT_ID_SUFFIX)?;
            let paired = format!("{prefix}{CONCEPT_NAME_SUFFIX}");
            let paired = names.contains(&paired).then_some(paired);
            Some((name.clone(), paired))
        })
        .collect()
}

/// The sentinel is valid whether or not the vocabulary lists it.
fn is_sentinel(value: &str) -> bool {
    normalize_concept_id(value).as_deref() == Some(NO_MATCHING_CONCEPT_ID)
}

/// Replaces unknown concept ids with the "No Matching Concept" sentinel.
///
/// Both the id and its paired name are replaced; known ids, the sentinel
/// itself and absent values are left untouched. Unknown ids are an expected condition and
/// never fail the run.
pub fn validate_concepts(
    frame: &mut OmopFrame,
    reference: &ConceptReference,
) -> Result<ConceptValidation> {
    let mut validation = ConceptValidation::default();
    for (id_column, name_column) in concept_columns(frame) {
        let mut ids = string_values(&frame.data, &id_column)?;
        let mut names = match &name_column {
            Some(column) => Some(string_values(&frame.data, column)?),
            None => None,
        };

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (row, id) in ids.iter_mut().enumerate() {
            let Some(value) = id.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            if reference.contains(value) || is_sentinel(value) {
                continue;
            }
            *counts.entry(value.to_string()).or_default() += 1;
            *id = Some(NO_MATCHING_CONCEPT_ID.to_string());
            if let Some(names) = names.as_mut() {
                names[row] = Some(NO_MATCHING_CONCEPT_NAME.to_string());
            }
        }
        if counts.is_empty() {
            continue;
        }

        set_string_column(&mut frame.data, &id_column, ids)?;
        if let (Some(column), Some(names)) = (&name_column, names) {
            set_string_column(&mut frame.data, column, names)?;
        }
        for (value, count) in counts {
            warn!(
                table = %frame.table,
                column = %id_column,
                concept_id = %value,
                count,
                "concept id not in reference vocabulary, replaced with 0"
            );
            validation.replaced_cells += count;
            validation.unresolved.push(UnresolvedConcept {
                table: frame.table,
                column: id_column.clone(),
                value,
                count,
            });
        }
    }
    Ok(validation)
}
