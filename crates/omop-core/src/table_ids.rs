//! Surrogate primary keys for combined fact tables.

use polars::prelude::{IntoColumn, NamedFrom, Series};
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::frame::{OmopFrame, string_values};

/// Keys every row of `frame` with `1..=n` in current row order.
///
/// The `{table}_id` column is inserted first. A frame may be keyed once:
/// a second call, or an id column that already holds values, is a
/// [`LinkError::DoubleAssignment`]. The person table is keyed by the person
/// id mapper and is rejected the same way. Returns the number of ids
/// assigned.
pub fn assign_table_ids(frame: &mut OmopFrame) -> Result<usize> {
    let table = frame.table;
    let column = table.id_column();
    let double = || LinkError::DoubleAssignment {
        table,
        column: column.to_string(),
    };
    if frame.meta.ids_assigned || !frame.table.is_fact_table() {
        return Err(double());
    }
    if frame.has_column(column) {
        if string_values(&frame.data, column)?.iter().any(Option::is_some) {
            return Err(double());
        }
        // an all-null placeholder column from a producer is replaced
        let _ = frame.data.drop_in_place(column)?;
    }

    let height = frame.record_count();
    let ids: Vec<i64> = (1..=i64::try_from(height).unwrap_or(i64::MAX)).collect();
    let series = Series::new(column.into(), ids);
    frame.data.insert_column(0, series.into_column())?;
    frame.meta.ids_assigned = true;
    debug!(table = %table, column, rows = height, "assigned table ids");
    Ok(height)
}

#[cfg(test)]
mod tests {
    use omop_ingest::CsvTable;
    use omop_model::TableType;

    use super::*;

    fn frame(table: TableType, headers: &[&str], rows: usize) -> OmopFrame {
        let source = CsvTable {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: (0..rows)
                .map(|i| {
                    headers
                        .iter()
                        .map(|h| (!h.ends_with("_id") || *h == "person_id").then(|| format!("v{i}")))
                        .collect()
                })
                .collect(),
        };
        OmopFrame::from_csv_table(table, &source).unwrap()
    }

    #[test]
    fn ids_are_dense_and_first() {
        let mut observation = frame(TableType::Observation, &["person_id", "value_as_string"], 3);
        assert_eq!(assign_table_ids(&mut observation).unwrap(), 3);
        assert_eq!(observation.column_names()[0], "observation_id");
        assert_eq!(
            string_values(&observation.data, "observation_id").unwrap(),
            vec![Some("1".into()), Some("2".into()), Some("3".into())]
        );
    }

    #[test]
    fn second_assignment_is_rejected() {
        let mut death = frame(TableType::Death, &["person_id"], 2);
        assign_table_ids(&mut death).unwrap();
        assert!(matches!(
            assign_table_ids(&mut death),
            Err(LinkError::DoubleAssignment { .. })
        ));
    }

    #[test]
    fn producer_supplied_ids_are_rejected() {
        let mut measurement = frame(TableType::Measurement, &["person_id"], 1);
        measurement.data.with_column(Series::new("measurement_id".into(), vec!["7"])).unwrap();
        assert!(matches!(
            assign_table_ids(&mut measurement),
            Err(LinkError::DoubleAssignment { .. })
        ));
    }

    #[test]
    fn empty_placeholder_column_is_replaced() {
        let mut measurement = frame(TableType::Measurement, &["person_id", "measurement_id"], 2);
        assign_table_ids(&mut measurement).unwrap();
        assert_eq!(
            measurement.column_names(),
            vec!["measurement_id", "person_id"]
        );
    }

    #[test]
    fn person_table_is_not_keyed_here() {
        let mut person = frame(TableType::Person, &["person_id"], 1);
        assert!(assign_table_ids(&mut person).is_err());
    }
}
