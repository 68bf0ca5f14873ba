//! Table frames passed between linkage stages.
//!
//! An [`OmopFrame`] wraps a Polars DataFrame with the table type it targets
//! and the lifecycle flags the key stages check. Combined frames are
//! string-typed throughout; surrogate key columns become Int64 once the
//! table id assigner and foreign key rewriter have run.

use std::collections::HashMap;
use std::path::PathBuf;

use omop_ingest::{CsvTable, any_to_optional_string};
use omop_model::TableType;
use polars::prelude::{AnyValue, Column, DataFrame, IntoColumn, NamedFrom, PolarsResult, Series};

/// Provisional participant reference column in every subtable.
pub const PERSON_ID: &str = "person_id";
/// Provisional visit reference column.
pub const VISIT_OCCURRENCE_ID: &str = "visit_occurrence_id";

/// Provenance and lifecycle state of a frame.
#[derive(Debug, Clone, Default)]
pub struct OmopFrameMeta {
    /// Subtable files that contributed rows, in combine order.
    pub source_files: Vec<PathBuf>,
    /// Set once the table id assigner has keyed the rows.
    pub ids_assigned: bool,
    /// Set once person and visit references hold surrogate ids.
    pub references_rewritten: bool,
}

/// A combined table of one [`TableType`].
#[derive(Debug, Clone)]
pub struct OmopFrame {
    pub table: TableType,
    pub data: DataFrame,
    pub meta: OmopFrameMeta,
}

impl OmopFrame {
    pub fn new(table: TableType, data: DataFrame) -> Self {
        Self {
            table,
            data,
            meta: OmopFrameMeta::default(),
        }
    }

    /// Builds a frame from a single in-memory table.
    pub fn from_csv_table(table: TableType, source: &CsvTable) -> PolarsResult<Self> {
        let mut builder = FrameBuilder::new();
        builder.append(source);
        Ok(Self::new(table, builder.finish()?))
    }

    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }
}

/// Reads a column as optional strings, whatever its dtype.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    Ok((0..df.height())
        .map(|idx| any_to_optional_string(column.get(idx).unwrap_or(AnyValue::Null)))
        .collect())
}

/// Replaces (or appends) a string column.
pub fn set_string_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<String>>,
) -> PolarsResult<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Replaces (or appends) an Int64 column.
pub fn set_i64_column(df: &mut DataFrame, name: &str, values: Vec<Option<i64>>) -> PolarsResult<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Append-only, column-major builder for one table type.
///
/// Columns are the ordered union of every appended source: a column first
/// seen in a later source is back-filled with nulls for earlier rows, and a
/// column missing from a source is null for that source's rows. Null is the
/// "not supplied" marker; no clinical default is ever filled in.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    names: Vec<String>,
    index: HashMap<String, usize>,
    cells: Vec<Vec<Option<String>>>,
    height: usize,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn column_slot(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.cells.push(vec![None; self.height]);
        idx
    }

    /// Appends every row of `source` after the rows already collected.
    pub fn append(&mut self, source: &CsvTable) {
        let slots: Vec<usize> = source
            .headers
            .iter()
            .map(|header| self.column_slot(header))
            .collect();
        let added = source.rows.len();
        for column in &mut self.cells {
            column.reserve(added);
        }
        for row in &source.rows {
            let mut filled = vec![false; self.names.len()];
            for (pos, &slot) in slots.iter().enumerate() {
                if filled[slot] {
                    // duplicate header in one file: first occurrence wins
                    continue;
                }
                self.cells[slot].push(row.get(pos).cloned().flatten());
                filled[slot] = true;
            }
            for (slot, done) in filled.into_iter().enumerate() {
                if !done {
                    self.cells[slot].push(None);
                }
            }
        }
        self.height += added;
    }

    pub fn finish(self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .names
            .into_iter()
            .zip(self.cells)
            .map(|(name, values)| Series::new(name.into(), values).into_column())
            .collect();
        DataFrame::new(columns)
    }
}
