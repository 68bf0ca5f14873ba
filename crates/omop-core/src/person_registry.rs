//! Participant to surrogate `person_id` mapping.

use std::collections::HashMap;

use omop_model::{Person, PersonId, SourceParticipantId};
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::frame::{OmopFrame, PERSON_ID, string_values};
use crate::visit_registry::ordered;

/// Mutable person registry, alive only during the scan phase.
#[derive(Debug, Default)]
pub struct PersonRegistry {
    ids: HashMap<SourceParticipantId, PersonId>,
    order: Vec<SourceParticipantId>,
}

impl PersonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the person id for `participant`, allocating on first sight.
    pub fn get_or_create(&mut self, participant: &SourceParticipantId) -> PersonId {
        if let Some(id) = self.ids.get(participant) {
            return *id;
        }
        let id = PersonId::nth(self.order.len());
        self.ids.insert(participant.clone(), id);
        self.order.push(participant.clone());
        id
    }

    /// Registers every participant in `frames`.
    ///
    /// Tables are walked in [`omop_model::TableType::ALL`] order. Every
    /// table must carry a `person_id` column and every row a participant.
    pub fn scan(&mut self, frames: &[OmopFrame]) -> Result<()> {
        for frame in ordered(frames) {
            if !frame.has_column(PERSON_ID) {
                return Err(LinkError::MissingColumn {
                    table: frame.table,
                    column: PERSON_ID.to_string(),
                });
            }
            for (row, value) in string_values(&frame.data, PERSON_ID)?.into_iter().enumerate() {
                let participant = value
                    .and_then(|v| SourceParticipantId::new(v).ok())
                    .ok_or(LinkError::MissingParticipant {
                        table: frame.table,
                        row: row + 1,
                    })?;
                self.get_or_create(&participant);
            }
        }
        debug!(person_count = self.len(), "person scan complete");
        Ok(())
    }

    /// Ends the scan phase.
    pub fn freeze(self) -> PersonIndex {
        PersonIndex {
            ids: self.ids,
            order: self.order,
        }
    }
}

/// Frozen person registry.
#[derive(Debug, Clone, Default)]
pub struct PersonIndex {
    ids: HashMap<SourceParticipantId, PersonId>,
    order: Vec<SourceParticipantId>,
}

impl PersonIndex {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn lookup(&self, participant: &SourceParticipantId) -> Option<PersonId> {
        self.ids.get(participant).copied()
    }

    /// Persons in id order.
    pub fn persons(&self) -> impl Iterator<Item = Person> + '_ {
        self.order.iter().filter_map(|source| {
            self.ids.get(source).map(|id| Person {
                person_id: *id,
                source: source.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use omop_ingest::CsvTable;
    use omop_model::TableType;

    use super::*;

    fn participant(id: &str) -> SourceParticipantId {
        SourceParticipantId::new(id).unwrap()
    }

    fn frame(table: TableType, ids: &[Option<&str>]) -> OmopFrame {
        let source = CsvTable {
            headers: vec![PERSON_ID.to_string()],
            rows: ids.iter().map(|v| vec![v.map(str::to_string)]).collect(),
        };
        OmopFrame::from_csv_table(table, &source).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = PersonRegistry::new();
        let a = registry.get_or_create(&participant("P001"));
        let b = registry.get_or_create(&participant("P002"));
        assert_eq!(registry.get_or_create(&participant(" P001 ")), a);
        assert_eq!((a.get(), b.get()), (1, 2));
    }

    #[test]
    fn scan_uses_table_order_not_input_order() {
        let frames = vec![
            frame(TableType::Measurement, &[Some("P009")]),
            frame(TableType::Observation, &[Some("P005"), Some("P009")]),
        ];
        let mut registry = PersonRegistry::new();
        registry.scan(&frames).unwrap();
        let index = registry.freeze();
        let persons: Vec<(u64, String)> = index
            .persons()
            .map(|p| (p.person_id.get(), p.source.to_string()))
            .collect();
        assert_eq!(persons, vec![(1, "P005".into()), (2, "P009".into())]);
        assert_eq!(index.lookup(&participant("P404")), None);
    }

    #[test]
    fn empty_participant_is_fatal() {
        let frames = vec![frame(TableType::Death, &[Some("P001"), None])];
        let err = PersonRegistry::new().scan(&frames).unwrap_err();
        assert!(matches!(
            err,
            LinkError::MissingParticipant { table: TableType::Death, row: 2 }
        ));
    }
}
