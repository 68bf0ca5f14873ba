//! Stage-barrier linkage pipeline.
//!
//! # Stage order
//!
//! 1. **discover** - group `{instrument}--{table}.csv` files by table type
//! 2. **combine** - one append-only frame per table type
//! 3. **visit_scan** - populate the visit registry from every table
//! 4. **person_scan** - populate the person registry from every table
//! 5. **assign_ids** - dense row keys per fact table
//! 6. **rewrite** - provisional references to surrogate ids
//! 7. **validate_concepts** - unknown concept ids to the sentinel
//! 8. **output** - final CSVs and `run_log.json`
//!
//! Each stage observes the fully materialized result of the previous one;
//! both registries are frozen before the first rewrite.

use std::path::{Path, PathBuf};
use std::time::Instant;

use omop_ingest::discover_subtables;
use omop_model::{ConceptReference, LinkOptions, RunReport, SkippedInput, TableSummary, TableType};
use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use crate::combiner::{SubtableSource, combine_subtables};
use crate::concept_validator::validate_concepts;
use crate::error::{LinkError, Result};
use crate::fk_rewriter::rewrite_foreign_keys;
use crate::frame::OmopFrame;
use crate::output::{VISIT_OCCURRENCE, build_person_frame, build_visit_frame, write_frame_csv};
use crate::person_registry::PersonRegistry;
use crate::table_ids::assign_table_ids;
use crate::visit_registry::VisitRegistry;

/// Directory for combined, not yet rewritten, checkpoint tables.
pub const CHECKPOINT_DIR: &str = "combined";
pub const RUN_LOG: &str = "run_log.json";

/// Combined frames plus what the combine stage skipped.
#[derive(Debug, Clone, Default)]
pub struct CombinedInput {
    /// One frame per table type with at least one row, in
    /// [`TableType::ALL`] order.
    pub frames: Vec<OmopFrame>,
    pub skipped: Vec<SkippedInput>,
}

/// Fully linked tables, ready to be written.
#[derive(Debug, Clone)]
pub struct LinkedTables {
    pub person: OmopFrame,
    pub visit_occurrence: DataFrame,
    /// Rewritten fact tables in [`TableType::ALL`] order.
    pub facts: Vec<OmopFrame>,
    pub report: RunReport,
}

/// One linkage run over a directory of provisional subtables.
#[derive(Debug, Clone)]
pub struct LinkPipeline {
    options: LinkOptions,
    vocabulary: ConceptReference,
}

impl LinkPipeline {
    pub fn new(options: LinkOptions, vocabulary: ConceptReference) -> Self {
        Self {
            options,
            vocabulary,
        }
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Discovers and combines the subtables in `input_dir`.
    ///
    /// Table types whose files are all empty or header-only yield no frame;
    /// their files are listed in [`CombinedInput::skipped`].
    pub fn combine_dir(&self, input_dir: &Path) -> Result<CombinedInput> {
        let discovery = info_span!("discover").in_scope(|| -> Result<_> {
            let start = Instant::now();
            let discovery = discover_subtables(input_dir)?;
            info!(
                input_dir = %input_dir.display(),
                files = discovery.file_count(),
                ignored = discovery.ignored.len(),
                duration_ms = start.elapsed().as_millis(),
                "discovery complete"
            );
            Ok(discovery)
        })?;

        let mut combined = CombinedInput::default();
        for path in &discovery.ignored {
            warn!(path = %path.display(), "ignoring file without a known table type suffix");
            combined.skipped.push(SkippedInput {
                path: path.clone(),
                reason: "unrecognized table type".to_string(),
            });
        }

        info_span!("combine").in_scope(|| -> Result<()> {
            for table in TableType::ALL {
                let files = discovery.files(table);
                if files.is_empty() {
                    continue;
                }
                let sources: Vec<SubtableSource> =
                    files.iter().cloned().map(SubtableSource::File).collect();
                let result = combine_subtables(table, &sources)?;
                combined.skipped.extend(result.skipped);
                if result.frame.record_count() > 0 {
                    combined.frames.push(result.frame);
                    continue;
                }
                // Empty and header-only inputs carry nothing to link.
                for path in &result.frame.meta.source_files {
                    warn!(table = %table, path = %path.display(), "skipping subtable without rows");
                    combined.skipped.push(SkippedInput {
                        path: path.clone(),
                        reason: "no rows".to_string(),
                    });
                }
            }
            Ok(())
        })?;
        Ok(combined)
    }

    /// Runs the scan, key and validation stages over combined frames.
    ///
    /// Fails on the first integrity error; no partial result is returned.
    pub fn link_frames(&self, mut frames: Vec<OmopFrame>) -> Result<LinkedTables> {
        frames.sort_by_key(|frame| frame.table);
        let index_date = self.options.index_date;
        let mut report = RunReport::default();

        // =====================================================================
        // Scan phase: registries observe everything before resolving
        // =====================================================================
        let visits = info_span!("visit_scan").in_scope(|| -> Result<_> {
            let start = Instant::now();
            let mut registry = VisitRegistry::new();
            let stats = registry.scan(&frames, index_date)?;
            info!(
                visit_count = registry.len(),
                references = stats.references,
                no_visit = stats.no_visit,
                unparseable = stats.unparseable,
                duration_ms = start.elapsed().as_millis(),
                "visit scan complete"
            );
            Ok(registry.freeze())
        })?;

        let persons = info_span!("person_scan").in_scope(|| -> Result<_> {
            let start = Instant::now();
            let mut registry = PersonRegistry::new();
            registry.scan(&frames)?;
            info!(
                person_count = registry.len(),
                duration_ms = start.elapsed().as_millis(),
                "person scan complete"
            );
            Ok(registry.freeze())
        })?;

        // =====================================================================
        // Rewrite phase: registries are read-only from here on
        // =====================================================================
        let (demographics, mut facts): (Vec<OmopFrame>, Vec<OmopFrame>) = frames
            .into_iter()
            .partition(|frame| frame.table == TableType::Person);

        info_span!("assign_ids").in_scope(|| -> Result<()> {
            let start = Instant::now();
            let mut assigned = 0;
            for frame in &mut facts {
                assigned += assign_table_ids(frame)?;
            }
            info!(
                tables = facts.len(),
                assigned,
                duration_ms = start.elapsed().as_millis(),
                "table ids assigned"
            );
            Ok(())
        })?;

        info_span!("rewrite").in_scope(|| -> Result<()> {
            let start = Instant::now();
            for frame in &mut facts {
                let stats = rewrite_foreign_keys(frame, &persons, &visits, index_date)?;
                report.tables.push(TableSummary {
                    table: frame.table,
                    source_files: frame.meta.source_files.len(),
                    records: stats.rows,
                    linked_visits: stats.linked_visits,
                    output: None,
                });
            }
            info!(
                tables = facts.len(),
                records = report.total_records(),
                duration_ms = start.elapsed().as_millis(),
                "foreign keys rewritten"
            );
            Ok(())
        })?;

        let mut person = build_person_frame(&persons, demographics.first())?;
        if let Some(source) = demographics.first() {
            person.meta.source_files = source.meta.source_files.clone();
        }
        let visit_occurrence = build_visit_frame(&visits, &persons)?;

        info_span!("validate_concepts").in_scope(|| -> Result<()> {
            let start = Instant::now();
            for frame in std::iter::once(&mut person).chain(facts.iter_mut()) {
                let validation = validate_concepts(frame, &self.vocabulary)?;
                report.unresolved_concepts.extend(validation.unresolved);
            }
            info!(
                unresolved = report.unresolved_concepts.len(),
                replaced_cells = report.unresolved_concept_rows(),
                duration_ms = start.elapsed().as_millis(),
                "concept validation complete"
            );
            Ok(())
        })?;

        report.tables.insert(
            0,
            TableSummary {
                table: TableType::Person,
                source_files: person.meta.source_files.len(),
                records: person.record_count(),
                linked_visits: 0,
                output: None,
            },
        );
        report.person_count = persons.len();
        report.visit_count = visits.len();

        Ok(LinkedTables {
            person,
            visit_occurrence,
            facts,
            report,
        })
    }

    /// Runs every stage and writes the final tables under `output_dir`.
    ///
    /// The run log is written even when an integrity error aborts the run;
    /// the error is still returned.
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<RunReport> {
        let run_span = info_span!("link", input_dir = %input_dir.display());
        let _run_guard = run_span.enter();
        let run_start = Instant::now();

        let combined = self.combine_dir(input_dir)?;
        let skipped = combined.skipped.clone();

        if self.options.write_checkpoints {
            info_span!("checkpoint").in_scope(|| -> Result<()> {
                let dir = output_dir.join(CHECKPOINT_DIR);
                for frame in &combined.frames {
                    let mut data = frame.data.clone();
                    write_frame_csv(&mut data, &table_path(&dir, frame.table.as_str()))?;
                }
                info!(dir = %dir.display(), tables = combined.frames.len(), "checkpoints written");
                Ok(())
            })?;
        }

        let mut linked = match self.link_frames(combined.frames) {
            Ok(linked) => linked,
            Err(error) => {
                let report = RunReport {
                    skipped_inputs: skipped,
                    fatal: Some(error.to_string()),
                    ..RunReport::default()
                };
                if let Err(log_error) = write_run_log(&report, output_dir) {
                    warn!(error = %log_error, "failed to write run log for aborted run");
                }
                return Err(error);
            }
        };
        linked.report.skipped_inputs = skipped;

        info_span!("output").in_scope(|| -> Result<()> {
            let report = &mut linked.report;
            let path = table_path(output_dir, TableType::Person.as_str());
            report.outputs.push(write_frame_csv(&mut linked.person.data, &path)?);
            set_output(report, TableType::Person, path);

            let path = table_path(output_dir, VISIT_OCCURRENCE);
            report.outputs.push(write_frame_csv(&mut linked.visit_occurrence, &path)?);

            for frame in &mut linked.facts {
                let path = table_path(output_dir, frame.table.as_str());
                report.outputs.push(write_frame_csv(&mut frame.data, &path)?);
                set_output(report, frame.table, path);
            }
            Ok(())
        })?;

        write_run_log(&linked.report, output_dir)?;
        info!(
            output_dir = %output_dir.display(),
            person_count = linked.report.person_count,
            visit_count = linked.report.visit_count,
            records = linked.report.total_records(),
            unresolved_concepts = linked.report.unresolved_concepts.len(),
            duration_ms = run_start.elapsed().as_millis(),
            "link complete"
        );
        Ok(linked.report)
    }
}

fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.csv"))
}

fn set_output(report: &mut RunReport, table: TableType, path: PathBuf) {
    if let Some(summary) = report.tables.iter_mut().find(|s| s.table == table) {
        summary.output = Some(path);
    }
}

/// Writes `run_log.json` under `output_dir`.
pub fn write_run_log(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| LinkError::io(output_dir, e))?;
    let path = output_dir.join(RUN_LOG);
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    std::fs::write(&path, json).map_err(|e| LinkError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn pipeline() -> LinkPipeline {
        LinkPipeline::new(
            LinkOptions::default(),
            ConceptReference::from_pairs([("4214956", "History of clinical finding in subject")]),
        )
    }

    fn seed(dir: &Path) {
        fs::write(
            dir.join("aalsdxfx--observation.csv"),
            "person_id,observation_concept_id\nP001,4214956\n",
        )
        .unwrap();
        fs::write(dir.join("mortality--death.csv"), "").unwrap();
    }

    #[test]
    fn empty_only_table_type_yields_no_frame() {
        let input = TempDir::new().unwrap();
        seed(input.path());

        let combined = pipeline().combine_dir(input.path()).unwrap();
        let tables: Vec<TableType> = combined.frames.iter().map(|f| f.table).collect();
        assert_eq!(tables, vec![TableType::Observation]);
        assert_eq!(combined.skipped.len(), 1);
        assert!(combined.skipped[0].path.ends_with("mortality--death.csv"));
        assert_eq!(combined.skipped[0].reason, "empty file");
    }

    #[test]
    fn run_succeeds_next_to_an_empty_table_type() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        seed(input.path());

        let report = pipeline().run(input.path(), output.path()).unwrap();
        assert_eq!(report.person_count, 1);
        assert!(report.fatal.is_none());
        assert_eq!(report.skipped_inputs.len(), 1);
        assert!(report.tables.iter().all(|s| s.table != TableType::Death));
        assert!(!output.path().join("death.csv").exists());
        assert!(output.path().join("observation.csv").exists());
    }

    #[test]
    fn header_only_table_type_is_skipped() {
        let input = TempDir::new().unwrap();
        fs::write(
            input.path().join("aalsdxfx--observation.csv"),
            "person_id,observation_concept_id\nP001,4214956\n",
        )
        .unwrap();
        fs::write(input.path().join("mortality--death.csv"), "death_date\n").unwrap();

        let combined = pipeline().combine_dir(input.path()).unwrap();
        assert_eq!(combined.frames.len(), 1);
        assert_eq!(combined.skipped.len(), 1);
        assert_eq!(combined.skipped[0].reason, "no rows");
    }
}
