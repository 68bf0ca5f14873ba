//! Instrument mappers producing provisional OMOP subtables.
//!
//! Each mapper reads one registry export and writes a
//! `{instrument}--{table}.csv` subtable whose `person_id` and
//! `visit_occurrence_id` columns still hold participant ids and canonical
//! visit keys. `omop-core` resolves them to surrogate ids.

pub mod directory;
pub mod error;
pub mod fuzzy;
pub mod mapper;
pub mod mappers;

pub use directory::{MapSummary, map_directory};
pub use error::{MapError, Result};
pub use fuzzy::{SIMILARITY_THRESHOLD, is_similar_to};
pub use mapper::{
    FactRecord, InstrumentMapper, MapContext, MapOutput, PARTICIPANT_ID, SourceRow, run_mapper,
};
pub use mappers::{AlsHistoryCondition, VitalSignsMeasurement, registry};
