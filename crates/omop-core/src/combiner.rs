//! Unions the provisional subtables that target one table type.

use std::path::{Path, PathBuf};
use std::time::Instant;

use omop_ingest::{CsvTable, is_empty_file, read_csv_table};
use omop_model::{SkippedInput, TableType};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::frame::{FrameBuilder, OmopFrame};

/// One producer output feeding the combiner.
#[derive(Debug, Clone)]
pub enum SubtableSource {
    /// A `{instrument}--{table}.csv` file on disk.
    File(PathBuf),
    /// An already-loaded table, labelled for logs and provenance.
    Table { label: PathBuf, table: CsvTable },
}

impl SubtableSource {
    pub fn path(&self) -> &Path {
        match self {
            SubtableSource::File(path) => path,
            SubtableSource::Table { label, .. } => label,
        }
    }

    /// Loads the table, or `None` when the source is an empty file.
    fn load(&self) -> Result<Option<CsvTable>> {
        match self {
            SubtableSource::File(path) => {
                if is_empty_file(path)? {
                    return Ok(None);
                }
                Ok(Some(read_csv_table(path)?))
            }
            SubtableSource::Table { table, .. } => Ok(Some(table.clone())),
        }
    }
}

/// Output of [`combine_subtables`].
#[derive(Debug, Clone)]
pub struct CombinedTable {
    pub frame: OmopFrame,
    pub skipped: Vec<SkippedInput>,
}

/// Concatenates `sources` in the order given.
///
/// Rows keep their within-file order and files keep their source order.
/// Empty files are skipped with a warning; a header-only file contributes
/// its columns but no rows.
pub fn combine_subtables(table: TableType, sources: &[SubtableSource]) -> Result<CombinedTable> {
    let start = Instant::now();
    let mut builder = FrameBuilder::new();
    let mut skipped = Vec::new();
    let mut used = Vec::new();

    for source in sources {
        let path = source.path();
        let Some(loaded) = source.load()? else {
            warn!(table = %table, path = %path.display(), "skipping empty subtable");
            skipped.push(SkippedInput {
                path: path.to_path_buf(),
                reason: "empty file".to_string(),
            });
            continue;
        };
        debug!(
            table = %table,
            path = %path.display(),
            rows = loaded.len(),
            columns = loaded.headers.len(),
            "appending subtable"
        );
        builder.append(&loaded);
        used.push(path.to_path_buf());
    }

    let mut frame = OmopFrame::new(table, builder.finish()?);
    frame.meta.source_files = used;
    info!(
        table = %table,
        sources = frame.meta.source_files.len(),
        skipped = skipped.len(),
        records = frame.record_count(),
        duration_ms = start.elapsed().as_millis(),
        "combined subtables"
    );
    Ok(CombinedTable { frame, skipped })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::frame::string_values;

    #[test]
    fn combines_in_source_order_and_skips_empty_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a--observation.csv");
        let empty = dir.path().join("b--observation.csv");
        let header_only = dir.path().join("c--observation.csv");
        let last = dir.path().join("d--observation.csv");
        fs::write(&first, "person_id,observation_source_value\nP001,a1\nP002,a2\n").unwrap();
        fs::write(&empty, "  \n").unwrap();
        fs::write(&header_only, "person_id,value_as_string\n").unwrap();
        fs::write(&last, "observation_source_value,person_id\nd1,P003\n").unwrap();

        let sources: Vec<SubtableSource> = [&first, &empty, &header_only, &last]
            .into_iter()
            .map(|path| SubtableSource::File(path.clone()))
            .collect();
        let combined = combine_subtables(TableType::Observation, &sources).unwrap();

        assert_eq!(combined.skipped.len(), 1);
        assert_eq!(combined.skipped[0].path, empty);
        assert_eq!(combined.frame.meta.source_files.len(), 3);
        assert_eq!(
            combined.frame.column_names(),
            vec!["person_id", "observation_source_value", "value_as_string"]
        );
        assert_eq!(
            string_values(&combined.frame.data, "person_id").unwrap(),
            vec![Some("P001".into()), Some("P002".into()), Some("P003".into())]
        );
        assert_eq!(
            string_values(&combined.frame.data, "value_as_string").unwrap(),
            vec![None, None, None]
        );
    }

    #[test]
    fn in_memory_sources_are_combined() {
        let table = CsvTable {
            headers: vec!["person_id".into()],
            rows: vec![vec![Some("P001".into())]],
        };
        let sources = vec![
            SubtableSource::Table {
                label: "vital_signs--measurement".into(),
                table: table.clone(),
            },
            SubtableSource::Table {
                label: "labs--measurement".into(),
                table,
            },
        ];
        let combined = combine_subtables(TableType::Measurement, &sources).unwrap();
        assert_eq!(combined.frame.record_count(), 2);
        assert!(combined.skipped.is_empty());
    }
}
