//! Edit Engine - working state for the property editor
//!
//! This crate holds the editable replica of a document's server-side
//! properties and options:
//!
//! - `entity_store`: working set, baseline and deletion tracking, mutations
//! - `diff`: the payload extracted for persistence
//! - `conflict`: baseline-vs-server comparison and refresh/cancel resolution
//! - `working_state`: serializable capture used for local backups
//!
//! # Example
//!
//! ```
//! use edit_engine::EntityStore;
//! use property_model::{DocumentId, PropertyFields, PropertyType};
//!
//! let mut store = EntityStore::with_baseline(DocumentId::new("shop").unwrap(), Vec::new());
//! let id = store.add_property(PropertyFields::named("en", "Weight", PropertyType::default()));
//!
//! let diff = store.extract_diff();
//! assert_eq!(diff.property_ids(), vec![id]);
//! assert!(store.has_changed());
//! ```

pub mod conflict;
pub mod diff;
pub mod entity_store;
mod error;
pub mod working_state;

pub use conflict::{ConflictChoice, ConflictOutcome};
pub use diff::PropertyDiff;
pub use entity_store::EntityStore;
pub use error::*;
pub use working_state::WorkingState;
