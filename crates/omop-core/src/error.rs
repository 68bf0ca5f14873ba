use std::path::PathBuf;

use omop_ingest::IngestError;
use omop_model::TableType;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Run-level failures of the linkage pipeline.
///
/// Every variant aborts the run; recoverable per-row conditions never
/// surface here.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("dangling visit reference {reference:?} in {table} row {row}")]
    DanglingVisitReference {
        table: TableType,
        row: usize,
        reference: String,
    },

    #[error("participant {participant:?} in {table} row {row} was not seen during the person scan")]
    UnknownParticipant {
        table: TableType,
        row: usize,
        participant: String,
    },

    #[error("{table} row {row} has no participant id")]
    MissingParticipant { table: TableType, row: usize },

    #[error("visit {visit} has no registered participant")]
    UnlinkedVisit { visit: String },

    #[error("surrogate ids already assigned to {table} ({column})")]
    DoubleAssignment { table: TableType, column: String },

    #[error("foreign keys of {table} were already rewritten")]
    AlreadyRewritten { table: TableType },

    #[error("{table} is missing required column {column}")]
    MissingColumn { table: TableType, column: String },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run log: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
