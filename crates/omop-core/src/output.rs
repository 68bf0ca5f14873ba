//! Final table construction and CSV output.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use omop_model::{OutputDigest, Person, SourceParticipantId, TableType, VisitOccurrence};
use polars::prelude::{CsvWriter, DataFrame, IntoColumn, NamedFrom, SerWriter, Series};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::frame::{OmopFrame, PERSON_ID, VISIT_OCCURRENCE_ID, string_values};
use crate::person_registry::PersonIndex;
use crate::visit_registry::VisitIndex;

/// Name of the visit table in output paths.
pub const VISIT_OCCURRENCE: &str = "visit_occurrence";
pub const PERSON_SOURCE_VALUE: &str = "person_source_value";

const BUFFER_SIZE: usize = 65536;

/// Writes `data` as CSV with a header row; nulls become empty cells.
pub fn write_frame_csv(data: &mut DataFrame, path: &Path) -> Result<OutputDigest> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LinkError::io(parent, e))?;
    }
    let mut file = File::create(path).map_err(|e| LinkError::io(path, e))?;
    CsvWriter::new(&mut file).include_header(true).finish(data)?;
    drop(file);

    let sha256 = file_sha256(path)?;
    debug!(path = %path.display(), rows = data.height(), %sha256, "wrote table");
    Ok(OutputDigest {
        path: path.to_path_buf(),
        sha256,
    })
}

/// Hex sha256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| LinkError::io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer).map_err(|e| LinkError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Builds the `person` table from the frozen person index.
///
/// Demographic columns come from the combined person subtable when one
/// exists; the first row per participant wins. Participants without a
/// demographics row keep nulls.
pub fn build_person_frame(
    persons: &PersonIndex,
    demographics: Option<&OmopFrame>,
) -> Result<OmopFrame> {
    let rows: Vec<Person> = persons.persons().collect();
    let ids: Vec<i64> = rows.iter().map(|p| p.person_id.as_i64()).collect();
    let sources: Vec<&str> = rows.iter().map(|p| p.source.as_str()).collect();
    let mut columns = vec![
        Series::new(PERSON_ID.into(), ids).into_column(),
        Series::new(PERSON_SOURCE_VALUE.into(), sources).into_column(),
    ];

    if let Some(demographics) = demographics {
        let participants = string_values(&demographics.data, PERSON_ID)?;
        let mut first_row = HashMap::new();
        let mut duplicates = HashSet::new();
        for (row, participant) in participants.iter().enumerate() {
            let Some(participant) = participant
                .as_deref()
                .and_then(|p| SourceParticipantId::new(p).ok())
            else {
                continue;
            };
            if first_row.contains_key(&participant) {
                duplicates.insert(participant);
            } else {
                first_row.insert(participant, row);
            }
        }
        let mut duplicates: Vec<_> = duplicates.into_iter().collect();
        duplicates.sort();
        for participant in duplicates {
            warn!(
                %participant,
                "multiple demographics rows for participant, keeping the first"
            );
        }

        for name in demographics.column_names() {
            if matches!(name.as_str(), PERSON_ID | PERSON_SOURCE_VALUE | VISIT_OCCURRENCE_ID) {
                continue;
            }
            let values = string_values(&demographics.data, &name)?;
            let enriched: Vec<Option<String>> = rows
                .iter()
                .map(|person| {
                    first_row
                        .get(&person.source)
                        .and_then(|row| values[*row].clone())
                })
                .collect();
            columns.push(Series::new(name.as_str().into(), enriched).into_column());
        }
    }

    let mut frame = OmopFrame::new(TableType::Person, DataFrame::new(columns)?);
    frame.meta.ids_assigned = true;
    frame.meta.references_rewritten = true;
    Ok(frame)
}

/// Visit rows in id order, with participants mapped to person ids.
pub fn visit_occurrences(
    visits: &VisitIndex,
    persons: &PersonIndex,
) -> Result<Vec<VisitOccurrence>> {
    visits
        .occurrences()
        .map(|(visit_occurrence_id, key)| {
            let person_id = persons
                .lookup(&key.participant)
                .ok_or_else(|| LinkError::UnlinkedVisit {
                    visit: key.to_string(),
                })?;
            Ok(VisitOccurrence {
                visit_occurrence_id,
                person_id,
                visit_date: key.date,
                source_value: key.to_string(),
            })
        })
        .collect()
}

/// Builds the `visit_occurrence` table.
///
/// Columns: `visit_occurrence_id, person_id, visit_start_date,
/// visit_end_date, visit_source_value`. A visit spans one calendar day.
pub fn build_visit_frame(visits: &VisitIndex, persons: &PersonIndex) -> Result<DataFrame> {
    let rows = visit_occurrences(visits, persons)?;
    let dates: Vec<String> = rows
        .iter()
        .map(|visit| visit.visit_date.format("%Y-%m-%d").to_string())
        .collect();
    let columns = vec![
        Series::new(
            VISIT_OCCURRENCE_ID.into(),
            rows.iter().map(|v| v.visit_occurrence_id.as_i64()).collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new(
            PERSON_ID.into(),
            rows.iter().map(|v| v.person_id.as_i64()).collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new("visit_start_date".into(), dates.clone()).into_column(),
        Series::new("visit_end_date".into(), dates).into_column(),
        Series::new(
            "visit_source_value".into(),
            rows.iter().map(|v| v.source_value.clone()).collect::<Vec<_>>(),
        )
        .into_column(),
    ];
    Ok(DataFrame::new(columns)?)
}
