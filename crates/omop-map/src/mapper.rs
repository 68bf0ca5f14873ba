//! Row-mapper framework for per-instrument producers.
//!
//! A mapper turns one source instrument export into one provisional fact
//! table. It sees one row at a time and reports every produced fact as a
//! [`RowOutcome`], so a bad value skips a single fact and never the run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use omop_core::{DateError, is_missing_marker, resolve_relative_day};
use omop_ingest::CsvTable;
use omop_model::{RowOutcome, SourceParticipantId, TableType, VisitKey};
use tracing::{debug, info, warn};

use crate::error::{MapError, Result};

/// Participant column of every registry export.
pub const PARTICIPANT_ID: &str = "Participant_ID";

/// One source row with missing-marker aware accessors.
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    table: &'a CsvTable,
    index: usize,
}

impl<'a> SourceRow<'a> {
    pub fn new(table: &'a CsvTable, index: usize) -> Self {
        Self { table, index }
    }

    /// 1-based row number for logs.
    pub fn row_number(&self) -> usize {
        self.index + 1
    }

    /// Trimmed cell text; `NaN` and friends read as absent.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .value(self.index, column)
            .map(str::trim)
            .filter(|value| !is_missing_marker(value))
    }

    pub fn participant(&self) -> Option<SourceParticipantId> {
        self.get(PARTICIPANT_ID)
            .and_then(|value| SourceParticipantId::new(value).ok())
    }

    /// Parsed numeric cell. `Err` carries the raw text when it is not a number.
    pub fn number(&self, column: &str) -> std::result::Result<Option<f64>, String> {
        match self.get(column) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Some)
                .ok_or_else(|| raw.to_string()),
        }
    }

    /// Coded cell normalized for value map lookups (`"2.0"` reads as `"2"`).
    pub fn code(&self, column: &str) -> Option<String> {
        self.get(column).map(normalize_code)
    }
}

fn normalize_code(raw: &str) -> String {
    raw.strip_suffix(".0")
        .filter(|head| !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(raw)
        .to_string()
}

/// Settings shared by every mapper in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapContext {
    pub index_date: NaiveDate,
}

impl MapContext {
    pub fn new(index_date: NaiveDate) -> Self {
        Self { index_date }
    }

    /// Resolves a relative day cell through the shared date resolver.
    pub fn resolve_date(&self, raw: Option<&str>) -> std::result::Result<Option<NaiveDate>, DateError> {
        resolve_relative_day(raw, self.index_date)
    }

    /// Canonical provisional visit key, or `None` when there is no date.
    pub fn visit_reference(
        &self,
        participant: &SourceParticipantId,
        date: Option<NaiveDate>,
    ) -> Option<String> {
        date.map(|date| VisitKey::new(participant.clone(), date).to_string())
    }
}

/// One provisional fact row, keyed by output column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactRecord {
    values: BTreeMap<&'static str, String>,
}

impl FactRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn with_opt(self, column: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(column, value),
            None => self,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// A per-instrument producer of provisional fact rows.
pub trait InstrumentMapper: Send + Sync {
    /// Source export name, e.g. `vital_signs`.
    fn instrument(&self) -> &'static str;

    fn table_type(&self) -> TableType;

    /// Output columns in file order.
    fn columns(&self) -> &'static [&'static str];

    /// Source columns that must be present in the export header.
    fn required_source_columns(&self) -> &'static [&'static str] {
        &[PARTICIPANT_ID]
    }

    fn map_row(&self, row: &SourceRow<'_>, ctx: &MapContext) -> Vec<RowOutcome<FactRecord>>;

    /// Output file stem, `{instrument}--{table}`.
    fn output_stem(&self) -> String {
        format!("{}--{}", self.instrument(), self.table_type())
    }
}

/// Output of [`run_mapper`].
#[derive(Debug, Clone)]
pub struct MapOutput {
    pub table: CsvTable,
    pub input_rows: usize,
    pub skipped: usize,
}

/// Runs `mapper` over every row of `source`.
///
/// Skipped facts are logged and counted; the first fatal outcome aborts.
pub fn run_mapper(
    mapper: &dyn InstrumentMapper,
    source: &CsvTable,
    ctx: &MapContext,
) -> Result<MapOutput> {
    let instrument = mapper.instrument();
    for column in mapper.required_source_columns() {
        if source.column_index(column).is_none() {
            return Err(MapError::MissingColumn {
                instrument: instrument.to_string(),
                column: (*column).to_string(),
            });
        }
    }

    let columns = mapper.columns();
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut skipped = 0;
    for index in 0..source.len() {
        let row = SourceRow::new(source, index);
        for outcome in mapper.map_row(&row, ctx) {
            match outcome {
                RowOutcome::Ok(record) => rows.push(
                    columns
                        .iter()
                        .map(|column| record.get(column).map(str::to_string))
                        .collect(),
                ),
                RowOutcome::Skipped(reason) => {
                    skipped += 1;
                    warn!(instrument, row = row.row_number(), %reason, "skipping fact");
                }
                RowOutcome::Fatal(reason) => {
                    return Err(MapError::FatalRow {
                        instrument: instrument.to_string(),
                        row: row.row_number(),
                        reason,
                    });
                }
            }
        }
    }

    debug!(instrument, columns = columns.len(), "mapped source rows");
    info!(
        instrument,
        table = %mapper.table_type(),
        input_rows = source.len(),
        facts = rows.len(),
        skipped,
        "mapping complete"
    );
    Ok(MapOutput {
        table: CsvTable {
            headers: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        },
        input_rows: source.len(),
        skipped,
    })
}
