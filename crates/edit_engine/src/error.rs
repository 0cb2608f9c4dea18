//! Error types for the editing engine

use property_model::{OptionId, PropertyId};
use thiserror::Error;

/// Errors raised when assigning a captured working state to a store.
///
/// Regular edits never fail: edits against missing ids are silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Duplicate property id in working state: {0}")]
    DuplicatePropertyId(PropertyId),

    #[error("Duplicate option id in working state: {0}")]
    DuplicateOptionId(OptionId),

    #[error("Option {option_id} references missing property {property_id}")]
    OrphanedOption {
        option_id: OptionId,
        property_id: PropertyId,
    },

    #[error("Property {0} is both present and queued for deletion")]
    PropertyDeletedAndPresent(PropertyId),

    #[error("Option {0} is both present and queued for deletion")]
    OptionDeletedAndPresent(OptionId),

    #[error("Sorting entries do not match properties (offending id: {0})")]
    SortingMismatch(PropertyId),
}

pub type Result<T> = std::result::Result<T, EngineError>;
