use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

/// A CSV file held in memory with header-ordered, string-typed cells.
///
/// Empty cells are `None`; nothing is parsed or typed at this stage.
/// Header names and `*_id` cells are trimmed, every other cell keeps its
/// exact source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell at (`row`, `column`), `None` when absent or empty.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

/// Identifier columns (`person_id`, `visit_occurrence_id`, `*_concept_id`)
/// are compared as keys downstream, so their cells are trimmed.
fn is_key_column(header: &str) -> bool {
    header.to_ascii_lowercase().ends_with("_id")
}

/// Key cells are trimmed; other cells keep their source text. Blank cells
/// read as `None` either way.
fn normalize_cell(raw: &str, key: bool) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else if key {
        Some(raw.trim().to_string())
    } else {
        Some(raw.to_string())
    }
}

/// Returns true for zero-byte or whitespace-only files.
pub fn is_empty_file(path: &Path) -> Result<bool> {
    let metadata = std::fs::metadata(path).map_err(|e| IngestError::io(path, e))?;
    if metadata.len() == 0 {
        return Ok(true);
    }
    let contents = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;
    Ok(contents.iter().all(u8::is_ascii_whitespace))
}

pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    read_csv_table_with_delimiter(path, b',')
}

pub fn read_csv_table_with_delimiter(path: &Path, delimiter: u8) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| IngestError::csv(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::csv(path, e))?
        .iter()
        .map(normalize_header)
        .collect();
    let keys: Vec<bool> = headers.iter().map(|h| is_key_column(h)).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::csv(path, e))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let mut row = Vec::with_capacity(headers.len());
        for (idx, key) in keys.iter().enumerate() {
            row.push(record.get(idx).and_then(|raw| normalize_cell(raw, *key)));
        }
        rows.push(row);
    }
    Ok(CsvTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_cells_are_none_and_short_rows_are_padded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "\u{feff}a, b ,c\n1,,x\n2\n").unwrap();
        let table = read_csv_table(&path).unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec![Some("1".into()), None, Some("x".into())]);
        assert_eq!(table.rows[1], vec![Some("2".into()), None, None]);
        assert_eq!(table.value(0, "c"), Some("x"));
        assert_eq!(table.value(0, "missing"), None);
    }

    #[test]
    fn free_text_keeps_surrounding_spaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(
            &path,
            "person_id,visit_occurrence_id,value_as_string\n P001 , P001_5 ,  left arm \nP002,,   \n",
        )
        .unwrap();
        let table = read_csv_table(&path).unwrap();
        assert_eq!(table.value(0, "person_id"), Some("P001"));
        assert_eq!(table.value(0, "visit_occurrence_id"), Some("P001_5"));
        assert_eq!(table.value(0, "value_as_string"), Some("  left arm "));
        assert_eq!(table.value(1, "value_as_string"), None);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "a,b\n,\n1,2\n").unwrap();
        let table = read_csv_table(&path).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn detects_empty_files() {
        let dir = TempDir::new().unwrap();
        let zero = dir.path().join("zero.csv");
        let blank = dir.path().join("blank.csv");
        let header = dir.path().join("header.csv");
        fs::write(&zero, "").unwrap();
        fs::write(&blank, "\n \n").unwrap();
        fs::write(&header, "person_id\n").unwrap();
        assert!(is_empty_file(&zero).unwrap());
        assert!(is_empty_file(&blank).unwrap());
        assert!(!is_empty_file(&header).unwrap());
    }
}
