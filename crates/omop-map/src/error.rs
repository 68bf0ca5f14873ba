use std::path::PathBuf;

use omop_core::LinkError;
use omop_ingest::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("{instrument} source is missing required column {column}")]
    MissingColumn { instrument: String, column: String },

    #[error("{instrument} row {row}: {reason}")]
    FatalRow {
        instrument: String,
        row: usize,
        reason: String,
    },

    #[error("source directory not found: {path}")]
    SourceDirNotFound { path: PathBuf },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Output(#[from] LinkError),
}

pub type Result<T> = std::result::Result<T, MapError>;
