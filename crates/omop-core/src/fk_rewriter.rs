//! Final pass: provisional references to surrogate ids.
//!
//! Both registries are frozen by the time this runs. Anything that cannot
//! be resolved here means the scan phase and the producers disagree, so
//! every failure is fatal and names the offending row.

use chrono::NaiveDate;
use omop_model::SourceParticipantId;
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::frame::{OmopFrame, PERSON_ID, VISIT_OCCURRENCE_ID, set_i64_column, string_values};
use crate::person_registry::PersonIndex;
use crate::visit_registry::{VisitIndex, VisitLookup, canonicalize_visit_ref};

/// Counts from rewriting one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub rows: usize,
    pub linked_visits: usize,
    pub no_visit: usize,
}

/// Rewrites `person_id` and `visit_occurrence_id` of every row in place.
///
/// Row numbers in errors are 1-based positions in the combined table.
/// Columns other than the two reference columns are never touched.
pub fn rewrite_foreign_keys(
    frame: &mut OmopFrame,
    persons: &PersonIndex,
    visits: &VisitIndex,
    index_date: NaiveDate,
) -> Result<RewriteStats> {
    let table = frame.table;
    if frame.meta.references_rewritten {
        return Err(LinkError::AlreadyRewritten { table });
    }
    if !frame.has_column(PERSON_ID) {
        return Err(LinkError::MissingColumn {
            table,
            column: PERSON_ID.to_string(),
        });
    }

    let raw_participants = string_values(&frame.data, PERSON_ID)?;
    let raw_visits = if frame.has_column(VISIT_OCCURRENCE_ID) {
        Some(string_values(&frame.data, VISIT_OCCURRENCE_ID)?)
    } else {
        None
    };

    let mut stats = RewriteStats {
        rows: raw_participants.len(),
        ..RewriteStats::default()
    };
    let mut person_ids = Vec::with_capacity(stats.rows);
    let mut visit_ids = Vec::with_capacity(if raw_visits.is_some() { stats.rows } else { 0 });

    for (idx, raw) in raw_participants.iter().enumerate() {
        let row = idx + 1;
        let participant = raw
            .as_deref()
            .and_then(|v| SourceParticipantId::new(v).ok())
            .ok_or(LinkError::MissingParticipant { table, row })?;
        let person_id = persons
            .lookup(&participant)
            .ok_or_else(|| LinkError::UnknownParticipant {
                table,
                row,
                participant: participant.to_string(),
            })?;
        person_ids.push(Some(person_id.as_i64()));

        let Some(raw_visits) = &raw_visits else {
            continue;
        };
        let reference = raw_visits[idx].as_deref();
        let dangling = || LinkError::DanglingVisitReference {
            table,
            row,
            reference: reference.unwrap_or_default().to_string(),
        };
        let visit = canonicalize_visit_ref(&participant, reference, index_date)
            .map_err(|_| dangling())?;
        match visits.lookup(&visit) {
            VisitLookup::Linked(id) => {
                stats.linked_visits += 1;
                visit_ids.push(Some(id.as_i64()));
            }
            VisitLookup::NoVisit => {
                stats.no_visit += 1;
                visit_ids.push(None);
            }
            VisitLookup::Dangling => return Err(dangling()),
        }
    }

    set_i64_column(&mut frame.data, PERSON_ID, person_ids)?;
    if raw_visits.is_some() {
        set_i64_column(&mut frame.data, VISIT_OCCURRENCE_ID, visit_ids)?;
    }
    frame.meta.references_rewritten = true;
    debug!(
        table = %table,
        rows = stats.rows,
        linked_visits = stats.linked_visits,
        no_visit = stats.no_visit,
        "rewrote foreign keys"
    );
    Ok(stats)
}
