//! Error types for the property model

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid document id {id:?}: {reason}")]
    InvalidDocumentId { id: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, ModelError>;
