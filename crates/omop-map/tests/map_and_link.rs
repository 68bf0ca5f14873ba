//! Mapper output feeds straight into the linkage pipeline.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use omop_core::LinkPipeline;
use omop_ingest::read_csv_table;
use omop_map::{MapContext, MapError, map_directory, registry};
use omop_model::{ConceptReference, LinkOptions, TableType};
use tempfile::TempDir;

fn ctx() -> MapContext {
    MapContext::new(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap())
}

fn seed_exports(dir: &Path) {
    fs::write(
        dir.join("vital_signs.csv"),
        "Participant_ID,vsdt,hr,bpsys,bpdias,bppos\n\
         P001,5,72,120,,2\n\
         P002,,64,,,\n",
    )
    .unwrap();
    fs::write(
        dir.join("aalshxfx.csv"),
        "Participant_ID,Visit_Date,diagdt,onsetdt\nP001,5.0,-30,\n",
    )
    .unwrap();
}

fn column(path: &Path, name: &str) -> Vec<Option<String>> {
    let table = read_csv_table(path).unwrap();
    let idx = table.column_index(name).unwrap();
    table.rows.iter().map(|row| row[idx].clone()).collect()
}

fn ids(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

#[test]
fn mapped_exports_link_into_one_visit() {
    let source = TempDir::new().unwrap();
    let subtables = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_exports(source.path());

    let summaries = map_directory(&registry(), source.path(), subtables.path(), &ctx()).unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].table, TableType::ConditionOccurrence);
    assert_eq!(summaries[0].facts, 1);
    assert_eq!(summaries[1].instrument, "vital_signs");
    assert_eq!(summaries[1].input_rows, 2);
    assert_eq!(summaries[1].facts, 3);
    assert_eq!(summaries[1].skipped, 0);

    let measurement = subtables.path().join("vital_signs--measurement.csv");
    assert_eq!(
        column(&measurement, "visit_occurrence_id"),
        ids(&[Some("P001_2016-01-06"), Some("P001_2016-01-06"), None])
    );

    let vocabulary = ConceptReference::from_pairs([
        ("3027018", "Heart rate"),
        ("4152194", "Systolic blood pressure"),
        ("373182", "Amyotrophic lateral sclerosis"),
        ("32851", "Healthcare professional filled survey"),
        ("37546954", "mmHg"),
        ("4118124", "beats/min"),
        ("4060834", "Sitting blood pressure"),
    ]);
    let report = LinkPipeline::new(LinkOptions::default(), vocabulary)
        .run(subtables.path(), output.path())
        .unwrap();

    assert_eq!(report.person_count, 2);
    assert_eq!(report.visit_count, 1);
    assert!(report.unresolved_concepts.is_empty());

    let linked = output.path().join("measurement.csv");
    assert_eq!(column(&linked, "person_id"), ids(&[Some("1"), Some("1"), Some("2")]));
    assert_eq!(column(&linked, "visit_occurrence_id"), ids(&[Some("1"), Some("1"), None]));
    let conditions = output.path().join("condition_occurrence.csv");
    assert_eq!(column(&conditions, "visit_occurrence_id"), ids(&[Some("1")]));
}

#[test]
fn absent_exports_are_skipped() {
    let source = TempDir::new().unwrap();
    let subtables = TempDir::new().unwrap();
    fs::write(
        source.path().join("aalshxfx.csv"),
        "Participant_ID,Visit_Date,diagdt,onsetdt\nP001,0,-1,-2\n",
    )
    .unwrap();

    let summaries = map_directory(&registry(), source.path(), subtables.path(), &ctx()).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].facts, 2);
    assert!(!subtables.path().join("vital_signs--measurement.csv").exists());
}

#[test]
fn missing_participant_aborts_mapping() {
    let source = TempDir::new().unwrap();
    let subtables = TempDir::new().unwrap();
    fs::write(
        source.path().join("aalshxfx.csv"),
        "Participant_ID,Visit_Date,diagdt,onsetdt\nP001,0,-1,\n,0,-3,\n",
    )
    .unwrap();

    let err = map_directory(&registry(), source.path(), subtables.path(), &ctx()).unwrap_err();
    assert!(matches!(err, MapError::FatalRow { row: 2, .. }));
}

#[test]
fn missing_source_directory_is_an_error() {
    let subtables = TempDir::new().unwrap();
    let err = map_directory(
        &registry(),
        &subtables.path().join("nope"),
        subtables.path(),
        &ctx(),
    )
    .unwrap_err();
    assert!(matches!(err, MapError::SourceDirNotFound { .. }));
}
