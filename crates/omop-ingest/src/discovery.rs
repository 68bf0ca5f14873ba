//! Subtable discovery by file name.
//!
//! Producers write one file per (instrument, table type) pair named
//! `{instrument}--{table_type}.csv`, e.g. `vital_signs--measurement.csv`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use omop_model::TableType;

use crate::error::{IngestError, Result};

/// Provisional subtables grouped by target table type.
#[derive(Debug, Clone, Default)]
pub struct SubtableDiscovery {
    /// Files per table type, in file name order.
    pub subtables: BTreeMap<TableType, Vec<PathBuf>>,
    /// CSV files whose name does not follow the subtable convention.
    pub ignored: Vec<PathBuf>,
}

impl SubtableDiscovery {
    pub fn files(&self, table: TableType) -> &[PathBuf] {
        self.subtables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_count(&self) -> usize {
        self.subtables.values().map(Vec::len).sum()
    }
}

/// Lists all CSV files in a directory.
///
/// Returns files sorted by filename.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}

/// Splits a subtable file stem into (instrument, table type).
///
/// The table type is everything after the last `--`.
pub fn parse_subtable_name(stem: &str) -> Option<(String, TableType)> {
    let (instrument, table) = stem.rsplit_once("--")?;
    let instrument = instrument.trim();
    if instrument.is_empty() {
        return None;
    }
    let table = table.parse::<TableType>().ok()?;
    Some((instrument.to_string(), table))
}

/// Discovers provisional subtables in `dir` and groups them by table type.
pub fn discover_subtables(dir: &Path) -> Result<SubtableDiscovery> {
    let mut discovery = SubtableDiscovery::default();
    for path in list_csv_files(dir)? {
        let stem = path.file_stem().and_then(|v| v.to_str()).unwrap_or("");
        match parse_subtable_name(stem) {
            Some((_, table)) => discovery.subtables.entry(table).or_default().push(path),
            None => discovery.ignored.push(path),
        }
    }
    Ok(discovery)
}
