//! `aalshxfx` ALS history export to provisional `condition_occurrence` rows.

use omop_model::{RowOutcome, TableType};

use crate::mapper::{FactRecord, InstrumentMapper, MapContext, SourceRow};

const VISIT_DATE: &str = "Visit_Date";

const COLUMNS: &[&str] = &[
    "person_id",
    "condition_concept_id",
    "condition_concept_name",
    "condition_source_value",
    "condition_start_date",
    "condition_type_concept_id",
    "visit_occurrence_id",
];

/// (source field, concept id, concept name, source value)
const CONDITIONS: [(&str, &str, &str, &str); 2] = [
    (
        "diagdt",
        "373182",
        "Amyotrophic lateral sclerosis",
        "Date of ALS diagnosis",
    ),
    (
        "onsetdt",
        "2000000397",
        "ALS symptom onset",
        "Date of ALS symptom onset",
    ),
];

/// Maps ALS diagnosis and symptom onset dates to `condition_occurrence`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlsHistoryCondition;

impl InstrumentMapper for AlsHistoryCondition {
    fn instrument(&self) -> &'static str {
        "aalshxfx"
    }

    fn table_type(&self) -> TableType {
        TableType::ConditionOccurrence
    }

    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn map_row(&self, row: &SourceRow<'_>, ctx: &MapContext) -> Vec<RowOutcome<FactRecord>> {
        let Some(participant) = row.participant() else {
            return vec![RowOutcome::fatal("missing Participant_ID")];
        };
        let visit = match ctx.resolve_date(row.get(VISIT_DATE)) {
            Ok(date) => ctx.visit_reference(&participant, date),
            Err(error) => return vec![RowOutcome::skipped(format!("{VISIT_DATE}: {error}"))],
        };

        CONDITIONS
            .iter()
            .filter_map(|(field, concept_id, concept_name, source_value)| {
                let raw = row.get(field)?;
                let start = match ctx.resolve_date(Some(raw)) {
                    Ok(Some(date)) => date,
                    Ok(None) => return None,
                    Err(error) => return Some(RowOutcome::skipped(format!("{field}: {error}"))),
                };
                Some(RowOutcome::Ok(
                    FactRecord::new()
                        .with("person_id", participant.as_str())
                        .with("condition_concept_id", *concept_id)
                        .with("condition_concept_name", *concept_name)
                        .with("condition_source_value", *source_value)
                        .with("condition_start_date", start.format("%Y-%m-%d").to_string())
                        .with("condition_type_concept_id", "32851")
                        .with_opt("visit_occurrence_id", visit.clone()),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use omop_ingest::CsvTable;

    use super::*;
    use crate::mapper::run_mapper;

    fn source(rows: &[[&str; 4]]) -> CsvTable {
        CsvTable {
            headers: ["Participant_ID", "Visit_Date", "diagdt", "onsetdt"]
                .map(String::from)
                .to_vec(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| (!v.is_empty()).then(|| (*v).to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    fn ctx() -> MapContext {
        MapContext::new(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap())
    }

    #[test]
    fn diagnosis_and_onset_become_two_conditions() {
        let table = source(&[["P001", "0", "-30", "-400"]]);
        let output = run_mapper(&AlsHistoryCondition, &table, &ctx()).unwrap();
        let out = &output.table;

        assert_eq!(out.len(), 2);
        assert_eq!(out.value(0, "condition_concept_id"), Some("373182"));
        assert_eq!(out.value(0, "condition_start_date"), Some("2015-12-02"));
        assert_eq!(out.value(1, "condition_concept_id"), Some("2000000397"));
        assert_eq!(out.value(1, "condition_start_date"), Some("2014-11-27"));
        assert_eq!(out.value(1, "visit_occurrence_id"), Some("P001_2016-01-01"));
        assert_eq!(AlsHistoryCondition.output_stem(), "aalshxfx--condition_occurrence");
    }

    #[test]
    fn bad_date_skips_only_that_fact() {
        let table = source(&[["P002", "", "soon", "-10"]]);
        let output = run_mapper(&AlsHistoryCondition, &table, &ctx()).unwrap();
        assert_eq!(output.skipped, 1);
        assert_eq!(output.table.len(), 1);
        assert_eq!(output.table.value(0, "condition_concept_id"), Some("2000000397"));
        assert_eq!(output.table.value(0, "visit_occurrence_id"), None);
    }

    #[test]
    fn row_without_dates_produces_nothing() {
        let table = source(&[["P003", "2", "NaN", ""]]);
        let output = run_mapper(&AlsHistoryCondition, &table, &ctx()).unwrap();
        assert!(output.table.is_empty());
        assert_eq!(output.skipped, 0);
    }
}
