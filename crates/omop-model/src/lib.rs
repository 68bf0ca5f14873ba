pub mod concept;
pub mod error;
pub mod ids;
pub mod mapping;
pub mod options;
pub mod outcome;
pub mod report;
pub mod table;
pub mod visit;

pub use concept::{
    ConceptReference, NO_MATCHING_CONCEPT_ID, NO_MATCHING_CONCEPT_NAME, UnresolvedConcept,
    normalize_concept_id,
};
pub use error::{ModelError, Result};
pub use ids::{PersonId, SourceParticipantId, VisitOccurrenceId};
pub use mapping::{ConceptLookup, ConceptMapping, ValueMap};
pub use options::LinkOptions;
pub use outcome::RowOutcome;
pub use report::{OutputDigest, RunReport, SkippedInput, TableSummary};
pub use table::TableType;
pub use visit::{Person, VisitKey, VisitOccurrence, VisitRef};
