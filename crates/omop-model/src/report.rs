use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{TableType, UnresolvedConcept};

/// Row counts for one final table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: TableType,
    pub source_files: usize,
    pub records: usize,
    pub linked_visits: usize,
    pub output: Option<PathBuf>,
}

/// An input file that was not combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: String,
}

/// SHA-256 of a written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDigest {
    pub path: PathBuf,
    pub sha256: String,
}

/// Run log written next to the final tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub tables: Vec<TableSummary>,
    pub person_count: usize,
    pub visit_count: usize,
    pub unresolved_concepts: Vec<UnresolvedConcept>,
    pub skipped_inputs: Vec<SkippedInput>,
    pub outputs: Vec<OutputDigest>,
    /// Message of the integrity error that aborted the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl RunReport {
    /// Total number of concept cells replaced by the sentinel.
    pub fn unresolved_concept_rows(&self) -> usize {
        self.unresolved_concepts.iter().map(|c| c.count).sum()
    }

    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records).sum()
    }
}
