//! Runs the built-in mappers over a directory of registry exports.

use std::path::{Path, PathBuf};
use std::time::Instant;

use omop_core::{LinkError, OmopFrame, write_frame_csv};
use omop_ingest::read_csv_table;
use omop_model::{OutputDigest, TableType};
use tracing::{info, info_span};

use crate::error::{MapError, Result};
use crate::mapper::{InstrumentMapper, MapContext, run_mapper};

/// Outcome of one mapper over its export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSummary {
    pub instrument: String,
    pub table: TableType,
    pub input_rows: usize,
    pub facts: usize,
    pub skipped: usize,
    pub output: OutputDigest,
}

/// Maps `<source_dir>/<instrument>.csv` for each of `mappers` into
/// `<output_dir>/<instrument>--<table>.csv`.
///
/// Exports that are not present are skipped; the first mapper error aborts.
pub fn map_directory(
    mappers: &[Box<dyn InstrumentMapper>],
    source_dir: &Path,
    output_dir: &Path,
    ctx: &MapContext,
) -> Result<Vec<MapSummary>> {
    if !source_dir.is_dir() {
        return Err(MapError::SourceDirNotFound {
            path: source_dir.to_path_buf(),
        });
    }

    let mut summaries = Vec::new();
    for mapper in mappers {
        let instrument = mapper.instrument();
        let source_path = source_dir.join(format!("{instrument}.csv"));
        if !source_path.is_file() {
            info!(instrument, path = %source_path.display(), "no export found, skipping mapper");
            continue;
        }

        let summary = info_span!("map", instrument).in_scope(|| -> Result<_> {
            let start = Instant::now();
            let source = read_csv_table(&source_path)?;
            let output = run_mapper(mapper.as_ref(), &source, ctx)?;
            let facts = output.table.len();

            let mut frame = OmopFrame::from_csv_table(mapper.table_type(), &output.table)
                .map_err(LinkError::from)?;
            let path: PathBuf = output_dir.join(format!("{}.csv", mapper.output_stem()));
            let digest = write_frame_csv(&mut frame.data, &path)?;
            info!(
                path = %path.display(),
                facts,
                duration_ms = start.elapsed().as_millis(),
                "wrote provisional subtable"
            );
            Ok(MapSummary {
                instrument: instrument.to_string(),
                table: mapper.table_type(),
                input_rows: output.input_rows,
                facts,
                skipped: output.skipped,
                output: digest,
            })
        })?;
        summaries.push(summary);
    }
    Ok(summaries)
}
