//! `vital_signs` export to provisional `measurement` rows.
//!
//! One source row carries up to nine measurements taken at the same visit.
//! Each is mapped independently; a bad unit skips that measurement only.

use chrono::NaiveDate;
use omop_model::{RowOutcome, SourceParticipantId, TableType, ValueMap};

use crate::fuzzy::is_similar_to;
use crate::mapper::{FactRecord, InstrumentMapper, MapContext, PARTICIPANT_ID, SourceRow};

const EHR_TYPE_CONCEPT_ID: &str = "32851";
const VISIT_DATE: &str = "vsdt";

const COLUMNS: &[&str] = &[
    "person_id",
    "measurement_concept_id",
    "measurement_concept_name",
    "measurement_source_value",
    "measurement_date",
    "measurement_type_concept_id",
    "value_as_number",
    "value_as_concept_id",
    "value_as_concept_name",
    "value_source_value",
    "unit_concept_id",
    "unit_concept_name",
    "unit_source_value",
    "visit_occurrence_id",
];

/// A measurement with a fixed concept and unit.
struct FixedVital {
    field: &'static str,
    concept_id: &'static str,
    concept_name: &'static str,
    label: &'static str,
    unit_concept_id: &'static str,
    unit_name: &'static str,
    unit_source: &'static str,
}

const HEART_RATE: FixedVital = FixedVital {
    field: "hr",
    concept_id: "3027018",
    concept_name: "Heart rate",
    label: "Heart rate",
    unit_concept_id: "4118124",
    unit_name: "beats/min",
    unit_source: "Beats / min",
};

const RESPIRATORY_RATE: FixedVital = FixedVital {
    field: "rr",
    concept_id: "4313591",
    concept_name: "Respiratory rate",
    label: "Respiratory Rate",
    unit_concept_id: "4117833",
    unit_name: "breaths/min",
    unit_source: "Breaths / min",
};

const BMI: FixedVital = FixedVital {
    field: "bmi",
    concept_id: "3038553",
    concept_name: "Body mass index (BMI) [Ratio]",
    label: "BMI",
    unit_concept_id: "8523",
    unit_name: "ratio",
    unit_source: "BMI",
};

/// A measurement whose unit comes from a coded unit column.
struct UnitCodedVital {
    field: &'static str,
    unit_field: &'static str,
    concept_id: &'static str,
    concept_name: &'static str,
    label: &'static str,
}

const WEIGHT: UnitCodedVital = UnitCodedVital {
    field: "weight",
    unit_field: "weightu",
    concept_id: "3025315",
    concept_name: "Body weight",
    label: "Weight",
};

const HEIGHT: UnitCodedVital = UnitCodedVital {
    field: "height",
    unit_field: "heightu",
    concept_id: "3036277",
    concept_name: "Body height",
    label: "Height",
};

/// Maps the `vital_signs` export to `measurement`.
#[derive(Debug, Clone)]
pub struct VitalSignsMeasurement {
    temperature_routes: ValueMap,
    temperature_units: ValueMap,
    positions: ValueMap,
    weight_units: ValueMap,
    height_units: ValueMap,
}

impl Default for VitalSignsMeasurement {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared per-row values every measurement of the row carries.
struct RowBase<'a> {
    participant: &'a SourceParticipantId,
    date: Option<NaiveDate>,
    visit: Option<String>,
}

impl RowBase<'_> {
    fn record(&self, concept_id: &str, concept_name: &str, source_value: String) -> FactRecord {
        FactRecord::new()
            .with("person_id", self.participant.as_str())
            .with("measurement_concept_id", concept_id)
            .with("measurement_concept_name", concept_name)
            .with("measurement_source_value", source_value)
            .with_opt(
                "measurement_date",
                self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            )
            .with("measurement_type_concept_id", EHR_TYPE_CONCEPT_ID)
            .with_opt("visit_occurrence_id", self.visit.clone())
    }
}

impl VitalSignsMeasurement {
    pub fn new() -> Self {
        Self {
            temperature_routes: ValueMap::new(
                "temprt",
                [
                    ("1", "4188706", "Axillary temperature", "Axillary"),
                    ("2", "3006322", "Oral temperature", "Oral"),
                    ("3", "3022060", "Rectal temperature", "Rectal"),
                    ("4", "4215364", "Tympanic temperature", "Tympanic"),
                    (
                        "temporal",
                        "46235152",
                        "Body temperature - Temporal artery",
                        "Temporal",
                    ),
                ],
            ),
            temperature_units: ValueMap::new(
                "tempu",
                [
                    ("1", "9289", "degree Fahrenheit", "F"),
                    ("2", "586323", "degree Celsius", "C"),
                ],
            ),
            positions: ValueMap::new(
                "bppos",
                [
                    ("1", "4060833", "Standing blood pressure", "Standing"),
                    ("2", "4060834", "Sitting blood pressure", "Sitting"),
                    ("3", "4060832", "Lying blood pressure", "Supine"),
                ],
            ),
            weight_units: ValueMap::new(
                "weightu",
                [
                    ("1", "8739", "pound (US)", "lb"),
                    ("2", "9529", "kilogram", "kg"),
                ],
            ),
            height_units: ValueMap::new(
                "heightu",
                [
                    ("1", "9330", "inch (US)", "in"),
                    ("2", "8582", "centimeter", "cm"),
                ],
            ),
        }
    }

    fn temperature(&self, row: &SourceRow<'_>, base: &RowBase<'_>) -> Option<RowOutcome<FactRecord>> {
        let raw = row.get("temp")?;
        let value = match row.number("temp") {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(raw) => return Some(RowOutcome::skipped(format!("non-numeric temp {raw:?}"))),
        };

        let route_code = row
            .code("temprt")
            .filter(|code| self.temperature_routes.lookup(code).known().is_some())
            .or_else(|| {
                row.get("temprtsp")
                    .filter(|text| is_similar_to(text, "temporal"))
                    .map(|_| "temporal".to_string())
            });
        let Some(route) = route_code
            .as_deref()
            .and_then(|code| self.temperature_routes.lookup(code).known())
        else {
            return Some(RowOutcome::skipped(format!(
                "unrecognized temperature route (temprt {:?}, temprtsp {:?})",
                row.get("temprt"),
                row.get("temprtsp")
            )));
        };

        let unit_code = match row.code("tempu") {
            Some(code) => code,
            None if (35.0..=40.0).contains(&value) => "2".to_string(),
            None if (95.0..=104.0).contains(&value) => "1".to_string(),
            None => {
                return Some(RowOutcome::skipped(format!(
                    "cannot infer temperature unit for {value}"
                )));
            }
        };
        let Some(unit) = self.temperature_units.lookup(&unit_code).known() else {
            return Some(RowOutcome::skipped(format!(
                "invalid temperature unit {unit_code:?}"
            )));
        };

        Some(RowOutcome::Ok(
            base.record(
                &route.concept_id,
                &route.concept_name,
                format!("vital_signs+temp ({} Temperature)", route.source_label),
            )
            .with("value_as_number", raw)
            .with("unit_concept_id", unit.concept_id.as_str())
            .with("unit_concept_name", unit.concept_name.as_str())
            .with("unit_source_value", unit.source_label.as_str())
            .with(
                "value_source_value",
                format!("vital_signs+temp ({}): {raw}", route.source_label),
            ),
        ))
    }

    fn blood_pressure(
        &self,
        row: &SourceRow<'_>,
        base: &RowBase<'_>,
        field: &'static str,
        concept_id: &str,
        concept_name: &str,
        label: &str,
    ) -> Option<RowOutcome<FactRecord>> {
        let raw = row.get(field)?;
        if let Err(raw) = row.number(field) {
            return Some(RowOutcome::skipped(format!("non-numeric {field} {raw:?}")));
        }
        let position_code = row.code("bppos");
        let position = position_code
            .as_deref()
            .and_then(|code| self.positions.lookup(code).known());
        let value_source = match (position, position_code.as_deref()) {
            (Some(position), Some(code)) => format!(
                "vital_signs+{field}: {raw} | vital_signs+bppos ({}): {code}",
                position.source_label
            ),
            _ => format!("vital_signs+{field}: {raw}"),
        };

        Some(RowOutcome::Ok(
            base.record(concept_id, concept_name, format!("vital_signs+{field} ({label})"))
                .with("value_as_number", raw)
                .with("unit_concept_id", "37546954")
                .with("unit_concept_name", "mmHg")
                .with("unit_source_value", "mmHG")
                .with_opt("value_as_concept_id", position.map(|p| p.concept_id.clone()))
                .with_opt(
                    "value_as_concept_name",
                    position.map(|p| p.concept_name.clone()),
                )
                .with("value_source_value", value_source),
        ))
    }

    fn fixed(
        row: &SourceRow<'_>,
        base: &RowBase<'_>,
        vital: &FixedVital,
    ) -> Option<RowOutcome<FactRecord>> {
        let field = vital.field;
        let raw = row.get(field)?;
        if let Err(raw) = row.number(field) {
            return Some(RowOutcome::skipped(format!("non-numeric {field} {raw:?}")));
        }
        Some(RowOutcome::Ok(
            base.record(
                vital.concept_id,
                vital.concept_name,
                format!("vital_signs+{field} ({})", vital.label),
            )
            .with("value_as_number", raw)
            .with("unit_concept_id", vital.unit_concept_id)
            .with("unit_concept_name", vital.unit_name)
            .with("unit_source_value", vital.unit_source)
            .with("value_source_value", format!("vital_signs+{field}: {raw}")),
        ))
    }

    fn unit_coded(
        row: &SourceRow<'_>,
        base: &RowBase<'_>,
        vital: &UnitCodedVital,
        units: &ValueMap,
    ) -> Option<RowOutcome<FactRecord>> {
        let field = vital.field;
        let raw = row.get(field)?;
        if let Err(raw) = row.number(field) {
            return Some(RowOutcome::skipped(format!("non-numeric {field} {raw:?}")));
        }
        let code = row.code(vital.unit_field);
        let Some(unit) = code.as_deref().and_then(|code| units.lookup(code).known()) else {
            return Some(RowOutcome::skipped(format!(
                "invalid {} {:?}",
                vital.unit_field, code
            )));
        };
        Some(RowOutcome::Ok(
            base.record(
                vital.concept_id,
                vital.concept_name,
                format!("vital_signs+{field} ({})", vital.label),
            )
            .with("value_as_number", raw)
            .with("unit_concept_id", unit.concept_id.as_str())
            .with("unit_concept_name", unit.concept_name.as_str())
            .with("unit_source_value", unit.source_label.as_str())
            .with("value_source_value", format!("vital_signs+{field}: {raw}")),
        ))
    }
}

impl InstrumentMapper for VitalSignsMeasurement {
    fn instrument(&self) -> &'static str {
        "vital_signs"
    }

    fn table_type(&self) -> TableType {
        TableType::Measurement
    }

    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn required_source_columns(&self) -> &'static [&'static str] {
        &[PARTICIPANT_ID, VISIT_DATE]
    }

    fn map_row(&self, row: &SourceRow<'_>, ctx: &MapContext) -> Vec<RowOutcome<FactRecord>> {
        let Some(participant) = row.participant() else {
            return vec![RowOutcome::fatal("missing Participant_ID")];
        };
        let date = match ctx.resolve_date(row.get(VISIT_DATE)) {
            Ok(date) => date,
            Err(error) => return vec![RowOutcome::skipped(format!("{VISIT_DATE}: {error}"))],
        };
        let base = RowBase {
            participant: &participant,
            date,
            visit: ctx.visit_reference(&participant, date),
        };

        [
            self.temperature(row, &base),
            self.blood_pressure(
                row,
                &base,
                "bpsys",
                "4152194",
                "Systolic blood pressure",
                "Systolic Blood Pressure",
            ),
            self.blood_pressure(
                row,
                &base,
                "bpdias",
                "4154790",
                "Diastolic blood pressure",
                "Diastolic Blood Pressure",
            ),
            Self::fixed(row, &base, &HEART_RATE),
            Self::fixed(row, &base, &RESPIRATORY_RATE),
            Self::unit_coded(row, &base, &WEIGHT, &self.weight_units),
            Self::unit_coded(row, &base, &HEIGHT, &self.height_units),
            Self::fixed(row, &base, &BMI),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use omop_ingest::CsvTable;

    use super::*;
    use crate::mapper::run_mapper;

    const HEADERS: &[&str] = &[
        "Participant_ID",
        "vsdt",
        "temp",
        "temprt",
        "temprtsp",
        "tempu",
        "bpsys",
        "bpdias",
        "bppos",
        "hr",
        "rr",
        "weight",
        "weightu",
        "height",
        "heightu",
        "bmi",
    ];

    fn source(rows: &[[&str; 16]]) -> CsvTable {
        CsvTable {
            headers: HEADERS.iter().map(|h| (*h).to_string()).collect(),
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

    fn cell<'a>(table: &'a CsvTable, row: usize, column: &str) -> Option<&'a str> {
        table.value(row, column)
    }

    #[test]
    fn full_row_yields_every_measurement() {
        let table = source(&[[
            "P001", "5", "37.2", "2", "", "2", "120", "80", "2", "72", "16", "80", "2", "180",
            "2", "24.7",
        ]]);
        let output = run_mapper(&VitalSignsMeasurement::new(), &table, &ctx()).unwrap();
        let out = &output.table;

        assert_eq!(output.skipped, 0);
        assert_eq!(out.len(), 8);
        assert_eq!(cell(out, 0, "measurement_concept_id"), Some("3006322"));
        assert_eq!(cell(out, 0, "unit_concept_id"), Some("586323"));
        assert_eq!(cell(out, 0, "measurement_date"), Some("2016-01-06"));
        assert_eq!(cell(out, 0, "visit_occurrence_id"), Some("P001_2016-01-06"));
        assert_eq!(cell(out, 1, "value_as_concept_id"), Some("4060834"));
        assert_eq!(
            cell(out, 1, "value_source_value"),
            Some("vital_signs+bpsys: 120 | vital_signs+bppos (Sitting): 2")
        );
        assert_eq!(cell(out, 5, "unit_concept_id"), Some("9529"));
        assert_eq!(cell(out, 6, "unit_source_value"), Some("cm"));
        assert_eq!(cell(out, 7, "measurement_concept_id"), Some("3038553"));
        for row in 0..out.len() {
            assert_eq!(cell(out, row, "measurement_type_concept_id"), Some("32851"));
            assert_eq!(cell(out, row, "person_id"), Some("P001"));
        }
    }

    #[test]
    fn temperature_unit_is_inferred_from_range() {
        let blank = [""; 16];
        let mut celsius = blank;
        celsius[..5].copy_from_slice(&["P001", "1", "36.6", "1", ""]);
        let mut fahrenheit = blank;
        fahrenheit[..5].copy_from_slice(&["P001", "1", "98.6", "4", ""]);
        let mut unknown = blank;
        unknown[..5].copy_from_slice(&["P001", "1", "60", "3", ""]);

        let output =
            run_mapper(&VitalSignsMeasurement::new(), &source(&[celsius, fahrenheit, unknown]), &ctx())
                .unwrap();
        assert_eq!(output.table.len(), 2);
        assert_eq!(output.skipped, 1);
        assert_eq!(cell(&output.table, 0, "unit_concept_id"), Some("586323"));
        assert_eq!(cell(&output.table, 1, "unit_concept_id"), Some("9289"));
        assert_eq!(cell(&output.table, 1, "measurement_concept_id"), Some("4215364"));
    }

    #[test]
    fn temporal_route_from_free_text() {
        let mut row = [""; 16];
        row[..6].copy_from_slice(&["P002", "3", "99.1", "", "temporal artery", "1"]);
        let output = run_mapper(&VitalSignsMeasurement::new(), &source(&[row]), &ctx()).unwrap();
        assert_eq!(cell(&output.table, 0, "measurement_concept_id"), Some("46235152"));
        assert_eq!(
            cell(&output.table, 0, "measurement_source_value"),
            Some("vital_signs+temp (Temporal Temperature)")
        );
    }

    #[test]
    fn missing_visit_day_has_no_date_or_visit() {
        let mut row = [""; 16];
        row[0] = "P003";
        row[9] = "64";
        let output = run_mapper(&VitalSignsMeasurement::new(), &source(&[row]), &ctx()).unwrap();
        assert_eq!(output.table.len(), 1);
        assert_eq!(cell(&output.table, 0, "measurement_date"), None);
        assert_eq!(cell(&output.table, 0, "visit_occurrence_id"), None);
    }

    #[test]
    fn unparseable_visit_day_skips_the_row() {
        let mut row = [""; 16];
        row[..2].copy_from_slice(&["P004", "day five"]);
        row[9] = "64";
        row[10] = "12";
        let output = run_mapper(&VitalSignsMeasurement::new(), &source(&[row]), &ctx()).unwrap();
        assert!(output.table.is_empty());
        assert_eq!(output.skipped, 1);
    }

    #[test]
    fn unknown_weight_unit_is_skipped_not_defaulted() {
        let mut row = [""; 16];
        row[..2].copy_from_slice(&["P005", "0"]);
        row[11] = "70";
        row[12] = "9";
        let output = run_mapper(&VitalSignsMeasurement::new(), &source(&[row]), &ctx()).unwrap();
        assert!(output.table.is_empty());
        assert_eq!(output.skipped, 1);
    }
}
