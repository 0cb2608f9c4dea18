//! Conflict detection between the baseline and freshly fetched server data
//!
//! A fresh snapshot is compared against the baseline, never against the
//! working set. The outcome depends on whether local edits exist:
//!
//! - **No local edits**: a changed snapshot is adopted silently
//! - **Local edits**: the working set is left alone and the snapshot is held
//!   as conflict data until the caller picks [`ConflictChoice::Refresh`] or
//!   [`ConflictChoice::Cancel`]
//!
//! There is no field-level merge. Resolution is whole-snapshot only.

use crate::entity_store::{normalize_records, EntityStore};
use chrono::Utc;
use property_model::PropertyRecord;
use serde::{Deserialize, Serialize};

/// Result of comparing a fresh snapshot against the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// The store had never been loaded; the snapshot became the baseline
    Adopted,
    /// The snapshot equals the baseline; working data untouched
    Unchanged,
    /// The snapshot differed and there were no local edits; working set replaced
    Replaced,
    /// The snapshot differed while local edits exist; the caller must choose
    Conflict,
}

/// The caller's answer to a detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictChoice {
    /// Discard local edits and load the server snapshot
    Refresh,
    /// Keep local edits; the baseline stays stale
    Cancel,
}

/// A server snapshot waiting for the user's decision
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataConflict {
    pub(crate) server_snapshot: Vec<PropertyRecord>,
}

impl EntityStore {
    /// Route a freshly fetched snapshot through conflict detection
    pub fn detect_conflict(&mut self, fresh: Vec<PropertyRecord>) -> ConflictOutcome {
        if !self.is_loaded() {
            self.setup(fresh);
            return ConflictOutcome::Adopted;
        }

        let fresh = normalize_records(fresh);

        if fresh == self.baseline {
            self.baseline = fresh;
            self.baseline_loaded_at = Some(Utc::now());
            // A server that reverted to the baseline leaves nothing to choose between
            self.conflict = None;
            return ConflictOutcome::Unchanged;
        }

        if !self.has_changed {
            tracing::debug!(
                document_id = %self.document_id,
                "Server data changed with no local edits, adopting snapshot"
            );
            self.setup(fresh);
            return ConflictOutcome::Replaced;
        }

        tracing::info!(
            document_id = %self.document_id,
            "Server data changed while local edits exist, flagging conflict"
        );
        self.conflict = Some(DataConflict {
            server_snapshot: fresh,
        });
        ConflictOutcome::Conflict
    }

    /// Resolve a pending conflict.
    ///
    /// Returns false if there was no conflict to resolve.
    pub fn resolve_conflict(&mut self, choice: ConflictChoice) -> bool {
        let Some(conflict) = self.conflict.take() else {
            return false;
        };

        match choice {
            ConflictChoice::Refresh => {
                tracing::info!(document_id = %self.document_id, "Conflict resolved by refresh");
                self.setup(conflict.server_snapshot);
            }
            ConflictChoice::Cancel => {
                tracing::info!(
                    document_id = %self.document_id,
                    "Conflict dismissed, keeping local edits"
                );
            }
        }
        true
    }

    pub fn has_data_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// The server snapshot that caused the pending conflict
    pub fn conflict_data(&self) -> Option<&[PropertyRecord]> {
        self.conflict
            .as_ref()
            .map(|conflict| conflict.server_snapshot.as_slice())
    }
}
