use std::fs;

use omop_ingest::{discover_subtables, is_empty_file, read_csv_table};
use omop_model::TableType;
use tempfile::TempDir;

#[test]
fn discovered_subtables_read_back_in_file_order() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("b_instrument--observation.csv"),
        "person_id,visit_occurrence_id\nP002,P002_3\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("a_instrument--observation.csv"),
        "person_id,visit_occurrence_id\nP001,P001_5\n",
    )
    .unwrap();
    fs::write(dir.path().join("empty--death.csv"), "").unwrap();

    let discovery = discover_subtables(dir.path()).expect("discover");
    let observation = discovery.files(TableType::Observation);
    assert_eq!(observation.len(), 2);

    let first = read_csv_table(&observation[0]).expect("read first");
    assert_eq!(first.value(0, "person_id"), Some("P001"));
    let second = read_csv_table(&observation[1]).expect("read second");
    assert_eq!(second.value(0, "visit_occurrence_id"), Some("P002_3"));

    let death = discovery.files(TableType::Death);
    assert_eq!(death.len(), 1);
    assert!(is_empty_file(&death[0]).unwrap());
}
