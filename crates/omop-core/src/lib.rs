pub mod combiner;
pub mod concept_validator;
pub mod date_resolver;
pub mod error;
pub mod fk_rewriter;
pub mod frame;
pub mod output;
pub mod person_registry;
pub mod pipeline;
pub mod table_ids;
pub mod visit_registry;

pub use combiner::{CombinedTable, SubtableSource, combine_subtables};
pub use concept_validator::{ConceptValidation, validate_concepts};
pub use date_resolver::{DateError, is_missing_marker, relative_day_to_date, resolve_relative_day};
pub use error::{LinkError, Result};
pub use fk_rewriter::{RewriteStats, rewrite_foreign_keys};
pub use frame::{FrameBuilder, OmopFrame, OmopFrameMeta, PERSON_ID, VISIT_OCCURRENCE_ID};
pub use output::{build_person_frame, build_visit_frame, file_sha256, write_frame_csv};
pub use person_registry::{PersonIndex, PersonRegistry};
pub use pipeline::{CombinedInput, LinkPipeline, LinkedTables, write_run_log};
pub use table_ids::assign_table_ids;
pub use visit_registry::{
    VisitIndex, VisitKeyError, VisitLookup, VisitRegistry, VisitScanStats, canonicalize_visit_ref,
};
