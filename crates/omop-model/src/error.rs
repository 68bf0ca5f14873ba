use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid participant id: {0:?}")]
    InvalidParticipantId(String),
    #[error("unknown table type: {0}")]
    UnknownTableType(String),
    #[error("surrogate id must be non-zero")]
    ZeroSurrogateId,
}

pub type Result<T> = std::result::Result<T, ModelError>;
