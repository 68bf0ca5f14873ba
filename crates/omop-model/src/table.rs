//! OMOP table types produced by the linkage pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// The clinical tables a provisional subtable can target.
///
/// Declaration order is the fixed scan order: every registry walks tables
/// in [`TableType::ALL`] order so surrogate ids never depend on file
/// discovery order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Person,
    Observation,
    Measurement,
    ConditionOccurrence,
    DrugExposure,
    DeviceExposure,
    ProcedureOccurrence,
    Death,
}

impl TableType {
    pub const ALL: [TableType; 8] = [
        TableType::Person,
        TableType::Observation,
        TableType::Measurement,
        TableType::ConditionOccurrence,
        TableType::DrugExposure,
        TableType::DeviceExposure,
        TableType::ProcedureOccurrence,
        TableType::Death,
    ];

    /// Table name as used in file names and output paths.
    pub fn as_str(self) -> &'static str {
        match self {
            TableType::Person => "person",
            TableType::Observation => "observation",
            TableType::Measurement => "measurement",
            TableType::ConditionOccurrence => "condition_occurrence",
            TableType::DrugExposure => "drug_exposure",
            TableType::DeviceExposure => "device_exposure",
            TableType::ProcedureOccurrence => "procedure_occurrence",
            TableType::Death => "death",
        }
    }

    /// Primary key column of the final table.
    pub fn id_column(self) -> &'static str {
        match self {
            TableType::Person => "person_id",
            TableType::Observation => "observation_id",
            TableType::Measurement => "measurement_id",
            TableType::ConditionOccurrence => "condition_occurrence_id",
            TableType::DrugExposure => "drug_exposure_id",
            TableType::DeviceExposure => "device_exposure_id",
            TableType::ProcedureOccurrence => "procedure_occurrence_id",
            TableType::Death => "death_id",
        }
    }

    /// Column holding the event date, if the table has one.
    pub fn date_column(self) -> Option<&'static str> {
        match self {
            TableType::Person => None,
            TableType::Observation => Some("observation_date"),
            TableType::Measurement => Some("measurement_date"),
            TableType::ConditionOccurrence => Some("condition_start_date"),
            TableType::DrugExposure => Some("drug_exposure_start_date"),
            TableType::DeviceExposure => Some("device_exposure_start_date"),
            TableType::ProcedureOccurrence => Some("procedure_date"),
            TableType::Death => Some("death_date"),
        }
    }

    /// Fact tables get a surrogate row id; the person table is keyed by the
    /// person id mapper instead.
    pub fn is_fact_table(self) -> bool {
        !matches!(self, TableType::Person)
    }

    pub fn fact_tables() -> impl Iterator<Item = TableType> {
        Self::ALL.into_iter().filter(|table| table.is_fact_table())
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableType {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        TableType::ALL
            .into_iter()
            .find(|table| table.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownTableType(value.to_string()))
    }
}
