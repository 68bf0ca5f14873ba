//! Encounter identity: one visit occurrence per (participant, calendar day).
//!
//! Producers reference visits with provisional keys such as `P001_5`,
//! `P001_2016-01-06` or a bare date next to the row's participant. All of
//! them are canonicalized here, once, into a [`VisitKey`] before the registry
//! sees them, so two spellings of the same day can never allocate two
//! visits.
//!
//! Lifecycle: [`VisitRegistry`] is populated by a full scan of every combined
//! table, then frozen into a read-only [`VisitIndex`] that the foreign key
//! rewriter consults.

use std::collections::HashMap;

use chrono::NaiveDate;
use omop_model::{SourceParticipantId, TableType, VisitKey, VisitOccurrenceId, VisitRef};
use thiserror::Error;
use tracing::{debug, warn};

use crate::date_resolver::{is_missing_marker, resolve_relative_day};
use crate::error::Result;
use crate::frame::{OmopFrame, PERSON_ID, VISIT_OCCURRENCE_ID, string_values};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VisitKeyError {
    #[error("unparseable visit date {literal:?} in reference {reference:?}")]
    Unparseable { reference: String, literal: String },
}

/// Parses the date part of a provisional visit reference.
///
/// Accepted forms, in order: `YYYY-MM-DD` (optionally followed by a time),
/// an 8-digit `YYYYMMDD` that is a real calendar date, and a relative day
/// offset from `index_date`.
fn parse_visit_date(literal: &str, index_date: NaiveDate) -> Option<NaiveDate> {
    if let Some(head) = literal.get(..10) {
        let rest = &literal[10..];
        if (rest.is_empty() || rest.starts_with(' ') || rest.starts_with('T'))
            && let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d")
        {
            return Some(date);
        }
    }
    if literal.len() == 8
        && literal.bytes().all(|b| b.is_ascii_digit())
        && let Ok(date) = NaiveDate::parse_from_str(literal, "%Y%m%d")
    {
        return Some(date);
    }
    resolve_relative_day(Some(literal), index_date).ok().flatten()
}

/// Canonicalizes a provisional visit reference for `participant`.
///
/// A leading `"{participant}_"` is stripped; whatever remains is the date
/// literal. Missing references and missing literals are [`VisitRef::NoVisit`].
pub fn canonicalize_visit_ref(
    participant: &SourceParticipantId,
    raw: Option<&str>,
    index_date: NaiveDate,
) -> std::result::Result<VisitRef, VisitKeyError> {
    let Some(reference) = raw.map(str::trim).filter(|v| !is_missing_marker(v)) else {
        return Ok(VisitRef::NoVisit);
    };
    let prefix = format!("{participant}_");
    let literal = reference.strip_prefix(&prefix).unwrap_or(reference).trim();
    if is_missing_marker(literal) {
        return Ok(VisitRef::NoVisit);
    }
    parse_visit_date(literal, index_date)
        .map(|date| VisitRef::Visit(VisitKey::new(participant.clone(), date)))
        .ok_or_else(|| VisitKeyError::Unparseable {
            reference: reference.to_string(),
            literal: literal.to_string(),
        })
}

/// Counts from a registry scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitScanStats {
    pub references: usize,
    pub no_visit: usize,
    pub unparseable: usize,
}

/// Mutable visit registry, alive only during the scan phase.
#[derive(Debug, Default)]
pub struct VisitRegistry {
    ids: HashMap<VisitKey, VisitOccurrenceId>,
    order: Vec<VisitKey>,
}

impl VisitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the visit id for `visit`, allocating the next id on first
    /// sight. [`VisitRef::NoVisit`] never allocates.
    pub fn resolve(&mut self, visit: &VisitRef) -> Option<VisitOccurrenceId> {
        let key = visit.key()?;
        if let Some(id) = self.ids.get(key) {
            return Some(*id);
        }
        let id = VisitOccurrenceId::nth(self.order.len());
        self.ids.insert(key.clone(), id);
        self.order.push(key.clone());
        Some(id)
    }

    /// Discovers every visit referenced by `frames`.
    ///
    /// Tables are walked in [`TableType::ALL`] order and rows in frame
    /// order, whatever order `frames` arrives in. Unparseable references
    /// are logged and left undiscovered; the rewriter rejects them later.
    pub fn scan(&mut self, frames: &[OmopFrame], index_date: NaiveDate) -> Result<VisitScanStats> {
        let mut stats = VisitScanStats::default();
        for frame in ordered(frames) {
            if !has_visit_reference(frame) || !frame.has_column(PERSON_ID) {
                continue;
            }
            let participants = string_values(&frame.data, PERSON_ID)?;
            let references = string_values(&frame.data, VISIT_OCCURRENCE_ID)?;
            for (row, (participant, reference)) in participants.iter().zip(&references).enumerate() {
                // rows without a participant fail the person scan
                let Some(participant) = participant
                    .as_deref()
                    .and_then(|p| SourceParticipantId::new(p).ok())
                else {
                    continue;
                };
                stats.references += 1;
                match canonicalize_visit_ref(&participant, reference.as_deref(), index_date) {
                    Ok(VisitRef::NoVisit) => stats.no_visit += 1,
                    Ok(visit) => {
                        self.resolve(&visit);
                    }
                    Err(error) => {
                        stats.unparseable += 1;
                        warn!(
                            table = %frame.table,
                            row = row + 1,
                            %error,
                            "visit reference not discoverable"
                        );
                    }
                }
            }
        }
        debug!(
            visit_count = self.len(),
            references = stats.references,
            no_visit = stats.no_visit,
            unparseable = stats.unparseable,
            "visit scan complete"
        );
        Ok(stats)
    }

    /// Ends the scan phase.
    pub fn freeze(self) -> VisitIndex {
        VisitIndex {
            ids: self.ids,
            order: self.order,
        }
    }
}

/// Frames sorted into the fixed table enumeration order.
pub(crate) fn ordered(frames: &[OmopFrame]) -> Vec<&OmopFrame> {
    let mut ordered: Vec<&OmopFrame> = frames.iter().collect();
    ordered.sort_by_key(|frame| frame.table);
    ordered
}

/// Outcome of a read-only visit lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitLookup {
    NoVisit,
    Linked(VisitOccurrenceId),
    /// The key was never discovered during the scan.
    Dangling,
}

/// Frozen visit registry.
#[derive(Debug, Clone, Default)]
pub struct VisitIndex {
    ids: HashMap<VisitKey, VisitOccurrenceId>,
    order: Vec<VisitKey>,
}

impl VisitIndex {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn lookup(&self, visit: &VisitRef) -> VisitLookup {
        match visit {
            VisitRef::NoVisit => VisitLookup::NoVisit,
            VisitRef::Visit(key) => self
                .ids
                .get(key)
                .map_or(VisitLookup::Dangling, |id| VisitLookup::Linked(*id)),
        }
    }

    /// Visits in id order.
    pub fn occurrences(&self) -> impl Iterator<Item = (VisitOccurrenceId, &VisitKey)> {
        self.order
            .iter()
            .filter_map(|key| self.ids.get(key).map(|id| (*id, key)))
    }
}

/// Tables that carry a provisional visit column.
pub fn has_visit_reference(frame: &OmopFrame) -> bool {
    frame.table != TableType::Person && frame.has_column(VISIT_OCCURRENCE_ID)
}
