//! Save coordination
//!
//! A save snapshots the store's diff, backs up the working state, and sends
//! the diff to the remote, retrying transient failures with exponential
//! backoff. On success the backup is dropped and a follow-up fetch re-seeds
//! the baseline. Edits made while the save was in flight are kept on top of
//! the new baseline.
//!
//! The store is shared behind a [`tokio::sync::RwLock`]. Locks are only held
//! for synchronous sections, never across a remote call, so the user can keep
//! editing while a save is in flight.

use crate::error::{classify, classify_message, FetchError, FetchResult, SaveError};
use crate::remote::{PropertyRemote, SaveRequest};
use crate::retry::RetryPolicy;
use edit_engine::{ConflictOutcome, EntityStore, WorkingState};
use property_model::{DocumentId, PropertyRecord};
use std::sync::Arc;
use store::{BackupManager, BackupStorage};
use tokio::sync::RwLock;

/// A store shared between the editor and the save coordinator
pub type SharedStore = Arc<RwLock<EntityStore>>;

/// Wrap a store for sharing
pub fn shared(store: EntityStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// A save that did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub error: SaveError,
    /// Calls made to the save procedure, including the first
    pub attempts: u32,
    /// The error was retryable but every retry was used up
    pub retries_exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to save; no remote call was made
    NoChanges,
    /// Saved and confirmed by a follow-up fetch
    Saved {
        attempts: u32,
        /// Edits made during the save were kept on top of the new baseline
        edits_kept: bool,
    },
    /// Saved, but the follow-up fetch failed; the working state is untouched
    SavedUnconfirmed { attempts: u32, reason: FetchError },
    Failed(SaveFailure),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. } | SaveOutcome::SavedUnconfirmed { .. })
    }
}

/// Drives saves, loads and refreshes for one remote and backup backend
pub struct SaveCoordinator<R, S> {
    remote: R,
    backups: BackupManager<S>,
    policy: RetryPolicy,
}

impl<R: PropertyRemote, S: BackupStorage> SaveCoordinator<R, S> {
    pub fn new(remote: R, backups: BackupManager<S>) -> Self {
        Self {
            remote,
            backups,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn backups(&self) -> &BackupManager<S> {
        &self.backups
    }

    /// Persist the store's pending edits.
    ///
    /// Never fails: every problem is reported through the outcome.
    pub async fn save(&self, store: &SharedStore) -> SaveOutcome {
        let (document_id, diff, state, revision) = {
            let guard = store.read().await;
            if !guard.has_changed() {
                return SaveOutcome::NoChanges;
            }
            (
                guard.document_id().clone(),
                guard.extract_diff(),
                guard.working_state(),
                guard.revision(),
            )
        };

        self.write_backup(&state).await;

        tracing::info!(
            document_id = %document_id,
            properties = diff.properties_to_save.len(),
            options = diff.options_to_save.len(),
            deleted_properties = diff.deleted_property_ids.len(),
            deleted_options = diff.deleted_option_ids.len(),
            "Saving properties"
        );
        let request = SaveRequest::from_diff(document_id.clone(), diff.clone());

        let attempts = match self.send_with_retry(store, request).await {
            Ok(attempts) => attempts,
            Err(failure) => return SaveOutcome::Failed(failure),
        };

        let fetched = self.fetch(&document_id).await;

        let (outcome, pending) = {
            let mut guard = store.write().await;
            let edited_during_save = guard.revision() != revision;

            let outcome = match fetched {
                Ok(records) if !edited_during_save => {
                    guard.setup(records);
                    SaveOutcome::Saved {
                        attempts,
                        edits_kept: false,
                    }
                }
                Ok(records) => {
                    tracing::info!(
                        document_id = %document_id,
                        "Edits arrived during save, keeping them"
                    );
                    guard.rebaseline(records, &diff);
                    SaveOutcome::Saved {
                        attempts,
                        edits_kept: true,
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        document_id = %document_id,
                        "Save succeeded but refresh failed: {}",
                        reason
                    );
                    SaveOutcome::SavedUnconfirmed { attempts, reason }
                }
            };

            let pending = edited_during_save.then(|| guard.working_state());
            (outcome, pending)
        };

        match pending {
            Some(state) => self.write_backup(&state).await,
            None => self.discard_backup(&document_id).await,
        }

        outcome
    }

    /// Send one request until it succeeds or retrying stops making sense.
    ///
    /// Returns the number of calls made on success.
    async fn send_with_retry(
        &self,
        store: &SharedStore,
        request: SaveRequest,
    ) -> Result<u32, SaveFailure> {
        let document_id = request.document_id.clone();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let response = self.remote.save_properties(request.clone()).await;
            if response.success {
                tracing::debug!(document_id = %document_id, attempts, "Save accepted");
                return Ok(attempts);
            }

            let error = classify(&response);
            tracing::warn!(
                document_id = %document_id,
                attempt = attempts,
                retryable = error.is_retryable(),
                "Save failed: {}",
                error
            );

            if error.endangers_edits() {
                let state = store.read().await.working_state();
                self.write_backup(&state).await;
            }

            let retries_used = attempts - 1;
            if !error.is_retryable() || retries_used >= self.policy.max_retries {
                let retries_exhausted = error.is_retryable();
                return Err(SaveFailure {
                    error,
                    attempts,
                    retries_exhausted,
                });
            }

            let delay = self.policy.delay_for(retries_used + 1);
            tracing::info!(
                document_id = %document_id,
                delay_ms = delay.as_millis() as u64,
                "Retrying save"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetch the authoritative snapshot for a document
    pub async fn fetch(&self, document_id: &DocumentId) -> FetchResult<Vec<PropertyRecord>> {
        let response = self.remote.fetch_properties(document_id).await;
        if let Some(error) = response.error {
            return Err(FetchError::Remote(classify_message(error)));
        }
        response.properties.ok_or_else(|| {
            FetchError::Malformed("response carried neither properties nor an error".to_string())
        })
    }

    /// Initial load: fetch and seed the store
    pub async fn load(&self, store: &SharedStore) -> FetchResult<()> {
        let document_id = store.read().await.document_id().clone();
        let records = self.fetch(&document_id).await?;
        store.write().await.setup(records);
        Ok(())
    }

    /// Background refresh routed through conflict detection.
    ///
    /// A session or transport failure backs up unsaved edits before the
    /// error is returned.
    pub async fn refresh(&self, store: &SharedStore) -> FetchResult<ConflictOutcome> {
        let document_id = store.read().await.document_id().clone();
        let records = match self.fetch(&document_id).await {
            Ok(records) => records,
            Err(error) => {
                if let FetchError::Remote(cause) = &error {
                    if cause.endangers_edits() {
                        let pending = {
                            let guard = store.read().await;
                            guard.has_changed().then(|| guard.working_state())
                        };
                        if let Some(state) = pending {
                            self.write_backup(&state).await;
                        }
                    }
                }
                tracing::warn!(document_id = %document_id, "Refresh failed: {}", error);
                return Err(error);
            }
        };
        let outcome = store.write().await.detect_conflict(records);
        tracing::debug!(document_id = %document_id, ?outcome, "Refreshed from server");
        Ok(outcome)
    }

    async fn write_backup(&self, state: &WorkingState) {
        if let Err(e) = self.backups.backup(state).await {
            tracing::warn!(document_id = %state.document_id, "Backup failed: {}", e);
        }
    }

    async fn discard_backup(&self, document_id: &DocumentId) {
        if let Err(e) = self.backups.discard(document_id).await {
            tracing::warn!(document_id = %document_id, "Failed to discard backup: {}", e);
        }
    }
}
