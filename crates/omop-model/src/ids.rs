#![deny(unsafe_code)]

use std::fmt;
use std::num::NonZeroU64;

use crate::ModelError;

/// Participant identifier as supplied by the registry export.
///
/// Never used as a relational key in the output; the person id mapper
/// assigns a [`PersonId`] for it.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SourceParticipantId(String);

impl SourceParticipantId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidParticipantId(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            pub fn from_raw(raw: u64) -> Result<Self, ModelError> {
                NonZeroU64::new(raw)
                    .map(Self)
                    .ok_or(ModelError::ZeroSurrogateId)
            }

            /// The id handed out after `allocated` earlier ids.
            pub fn nth(allocated: usize) -> Self {
                let offset = u64::try_from(allocated).unwrap_or(u64::MAX);
                Self(NonZeroU64::MIN.saturating_add(offset))
            }

            pub fn get(self) -> u64 {
                self.0.get()
            }

            /// Value as written to the output tables.
            pub fn as_i64(self) -> i64 {
                i64::try_from(self.0.get()).unwrap_or(i64::MAX)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }
    };
}

surrogate_id!(
    /// Dense, 1-based surrogate key of the `person` table.
    PersonId
);

surrogate_id!(
    /// Dense, 1-based surrogate key of the `visit_occurrence` table.
    VisitOccurrenceId
);
