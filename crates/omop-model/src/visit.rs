use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{PersonId, SourceParticipantId, VisitOccurrenceId};

/// Canonical encounter identity: one participant on one calendar day.
///
/// Producers may spell the same day differently (relative offset, ISO date,
/// compact `YYYYMMDD`); all of them collapse to the same key once resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisitKey {
    pub participant: SourceParticipantId,
    pub date: NaiveDate,
}

impl VisitKey {
    pub fn new(participant: SourceParticipantId, date: NaiveDate) -> Self {
        Self { participant, date }
    }
}

impl fmt::Display for VisitKey {
    /// Renders the canonical provisional key, `{participant}_{YYYY-MM-DD}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.participant, self.date.format("%Y-%m-%d"))
    }
}

/// A provisional visit reference after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisitRef {
    /// The row has no encounter date; it links to no visit.
    NoVisit,
    Visit(VisitKey),
}

impl VisitRef {
    pub fn key(&self) -> Option<&VisitKey> {
        match self {
            VisitRef::NoVisit => None,
            VisitRef::Visit(key) => Some(key),
        }
    }
}

/// A row of the final `person` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: PersonId,
    pub source: SourceParticipantId,
}

/// A row of the final `visit_occurrence` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitOccurrence {
    pub visit_occurrence_id: VisitOccurrenceId,
    pub person_id: PersonId,
    pub visit_date: NaiveDate,
    pub source_value: String,
}
