//! Editor session orchestration
//!
//! A session owns one document's shared store and walks it through the
//! editing lifecycle: open (with an optional recovery offer), edit, save,
//! refresh, resolve conflicts, close.

use chrono::{DateTime, Utc};
use edit_engine::{ConflictChoice, ConflictOutcome, EntityStore};
use property_model::{DocumentId, PropertyRecord};
use std::sync::Arc;
use store::{BackupRecord, BackupStorage, StoreError};
use sync::{FetchError, PropertyRemote, SaveCoordinator, SaveOutcome, SharedStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No recovery is pending for {0}")]
    NoRecoveryPending(DocumentId),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// A backup offered to the user on open, with the snapshot it must be
/// checked against if accepted
#[derive(Debug, Clone)]
struct PendingRecovery {
    backup: BackupRecord,
    server_snapshot: Vec<PropertyRecord>,
}

pub struct EditorSession<R, S> {
    document_id: DocumentId,
    store: SharedStore,
    coordinator: Arc<SaveCoordinator<R, S>>,
    recovery: Option<PendingRecovery>,
}

impl<R: PropertyRemote, S: BackupStorage> EditorSession<R, S> {
    /// Open a document.
    ///
    /// The store is seeded from the server. If a backup with unsaved edits
    /// newer than `confirmed_at` exists, it is held as a recovery offer until
    /// the caller accepts or discards it.
    pub async fn open(
        document_id: DocumentId,
        coordinator: Arc<SaveCoordinator<R, S>>,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let backup = coordinator
            .backups()
            .find_recoverable(&document_id, confirmed_at)
            .await;
        let snapshot = coordinator.fetch(&document_id).await?;

        let store = EntityStore::with_baseline(document_id.clone(), snapshot.clone());
        let recovery = backup.map(|backup| {
            tracing::info!(
                document_id = %document_id,
                age = %backup.age_description(),
                "Recoverable backup found"
            );
            PendingRecovery {
                backup,
                server_snapshot: snapshot,
            }
        });

        Ok(Self {
            document_id,
            store: sync::shared(store),
            coordinator,
            recovery,
        })
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The backup waiting for the user's decision
    pub fn recovery_offer(&self) -> Option<&BackupRecord> {
        self.recovery.as_ref().map(|pending| &pending.backup)
    }

    /// Restore the offered backup, then check it against the server snapshot
    /// fetched on open
    pub async fn accept_recovery(&mut self) -> Result<ConflictOutcome> {
        let pending = self
            .recovery
            .take()
            .ok_or_else(|| SessionError::NoRecoveryPending(self.document_id.clone()))?;

        let mut restored = self.coordinator.backups().restore(pending.backup)?;
        let outcome = restored.detect_conflict(pending.server_snapshot);
        *self.store.write().await = restored;

        tracing::info!(document_id = %self.document_id, ?outcome, "Recovery accepted");
        Ok(outcome)
    }

    /// Drop the offered backup and keep the server data
    pub async fn discard_recovery(&mut self) -> Result<()> {
        if self.recovery.take().is_none() {
            return Err(SessionError::NoRecoveryPending(self.document_id.clone()));
        }
        self.coordinator.backups().discard(&self.document_id).await?;
        Ok(())
    }

    /// Apply an edit to the store
    pub async fn edit<F, T>(&self, mutator: F) -> T
    where
        F: FnOnce(&mut EntityStore) -> T,
    {
        let mut store = self.store.write().await;
        mutator(&mut *store)
    }

    pub async fn has_unsaved_changes(&self) -> bool {
        self.store.read().await.has_changed()
    }

    pub async fn save(&self) -> SaveOutcome {
        self.coordinator.save(&self.store).await
    }

    pub async fn refresh(&self) -> Result<ConflictOutcome> {
        Ok(self.coordinator.refresh(&self.store).await?)
    }

    /// Answer a pending conflict. Returns false if there was none.
    pub async fn resolve_conflict(&self, choice: ConflictChoice) -> bool {
        let resolved = self.store.write().await.resolve_conflict(choice);
        if resolved && choice == ConflictChoice::Refresh {
            if let Err(e) = self.coordinator.backups().discard(&self.document_id).await {
                tracing::warn!(document_id = %self.document_id, "Failed to discard backup: {}", e);
            }
        }
        resolved
    }

    /// End the session, backing up edits that were never saved.
    ///
    /// Returns when the server data was last confirmed.
    pub async fn close(self) -> Option<DateTime<Utc>> {
        let (state, confirmed_at) = {
            let store = self.store.read().await;
            (
                store.has_changed().then(|| store.working_state()),
                store.baseline_loaded_at(),
            )
        };

        if let Some(state) = state {
            tracing::info!(document_id = %self.document_id, "Closing with unsaved edits");
            if let Err(e) = self.coordinator.backups().backup(&state).await {
                tracing::warn!(document_id = %self.document_id, "Backup failed: {}", e);
            }
        }
        confirmed_at
    }
}
