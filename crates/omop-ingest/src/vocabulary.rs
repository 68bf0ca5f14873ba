//! Reference vocabulary loading.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use omop_model::ConceptReference;
use tracing::{debug, warn};

use crate::csv_table::read_csv_table_with_delimiter;
use crate::error::{IngestError, Result};

const CONCEPT_ID: &str = "concept_id";
const CONCEPT_NAME: &str = "concept_name";

/// Picks tab for OMOP `CONCEPT.csv` exports, comma otherwise.
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|e| IngestError::io(path, e))?;
    if first_line.contains('\t') && !first_line.contains(',') {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}

/// Loads `concept_id` / `concept_name` pairs from a vocabulary file.
///
/// Ids are read as text; extra columns are ignored.
pub fn load_concept_reference(path: &Path) -> Result<ConceptReference> {
    let delimiter = sniff_delimiter(path)?;
    let table = read_csv_table_with_delimiter(path, delimiter)?;
    let id_idx = table
        .headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(CONCEPT_ID))
        .ok_or_else(|| IngestError::MissingColumn {
            path: path.to_path_buf(),
            column: CONCEPT_ID.to_string(),
        })?;
    let name_idx = table
        .headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(CONCEPT_NAME))
        .ok_or_else(|| IngestError::MissingColumn {
            path: path.to_path_buf(),
            column: CONCEPT_NAME.to_string(),
        })?;

    let mut reference = ConceptReference::new();
    let mut blank_ids = 0usize;
    for row in &table.rows {
        let Some(id) = row.get(id_idx).and_then(Option::as_deref) else {
            blank_ids += 1;
            continue;
        };
        let name = row
            .get(name_idx)
            .and_then(Option::as_deref)
            .unwrap_or_default();
        reference.insert(id, name);
    }
    if blank_ids > 0 {
        warn!(
            path = %path.display(),
            blank_ids,
            "vocabulary rows without concept_id ignored"
        );
    }
    debug!(
        path = %path.display(),
        concept_count = reference.len(),
        "loaded concept reference"
    );
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_comma_separated_vocabulary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("concept.csv");
        std::fs::write(
            &path,
            "concept_id,concept_name,domain_id\n3025315,Body weight,Measurement\n,orphan,x\n",
        )
        .unwrap();
        let reference = load_concept_reference(&path).unwrap();
        assert_eq!(reference.len(), 1);
        assert_eq!(reference.name("3025315"), Some("Body weight"));
    }

    #[test]
    fn loads_tab_separated_vocabulary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CONCEPT.csv");
        std::fs::write(
            &path,
            "concept_id\tconcept_name\tvocabulary_id\n2000000397\tALS symptom onset\tCustom\n",
        )
        .unwrap();
        let reference = load_concept_reference(&path).unwrap();
        assert!(reference.contains("2000000397"));
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("concept.csv");
        std::fs::write(&path, "concept_id\n1\n").unwrap();
        let err = load_concept_reference(&path).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { column, .. } if column == "concept_name"));
    }
}
