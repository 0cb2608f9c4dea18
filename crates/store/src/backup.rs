//! Local backup and recovery of unsaved working state
//!
//! A backup is written before every save attempt and refreshed when a save
//! fails for authentication or network reasons. On open, the editor asks the
//! [`BackupManager`] whether a recoverable backup exists and offers it to the
//! user.

use crate::{BackupStorage, Result, StoreError};
use chrono::{DateTime, Utc};
use edit_engine::{EntityStore, WorkingState};
use property_model::DocumentId;
use serde::{Deserialize, Serialize};

/// Current on-disk format of a backup record
pub const BACKUP_FORMAT_VERSION: u32 = 1;

const KEY_PREFIX: &str = "backup.";

/// A persisted snapshot of a store's working state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub format_version: u32,
    pub document_id: DocumentId,
    /// When the backup was written
    pub timestamp: DateTime<Utc>,
    pub state: WorkingState,
}

impl BackupRecord {
    pub fn new(state: WorkingState) -> Self {
        Self {
            format_version: BACKUP_FORMAT_VERSION,
            document_id: state.document_id.clone(),
            timestamp: Utc::now(),
            state,
        }
    }

    /// Whether the backup holds edits that were never saved
    pub fn has_unsaved_changes(&self) -> bool {
        self.state.has_changed
    }

    /// Human-readable age, e.g. "5 minutes ago"
    pub fn age_description(&self) -> String {
        describe_age(self.timestamp, Utc::now())
    }
}

fn describe_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_secs = (now - timestamp).num_seconds().max(0);

    if diff_secs < 60 {
        "Just now".to_string()
    } else if diff_secs < 3600 {
        let mins = diff_secs / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff_secs < 86400 {
        let hours = diff_secs / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = diff_secs / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

/// Storage key for a document's backup
pub fn backup_key(document_id: &DocumentId) -> String {
    format!("{}{}", KEY_PREFIX, document_id)
}

/// Writes, loads and discards backups through a [`BackupStorage`]
pub struct BackupManager<S> {
    storage: S,
    enabled: bool,
}

impl<S: BackupStorage> BackupManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            enabled: true,
        }
    }

    /// Turn backups on or off; a disabled manager writes nothing and finds nothing
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist a working state, replacing any previous backup for the document
    pub async fn backup(&self, state: &WorkingState) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let record = BackupRecord::new(state.clone());
        let key = backup_key(&record.document_id);
        let content = serde_json::to_string(&record)?;
        self.storage.put(&key, content).await?;

        tracing::debug!(
            document_id = %record.document_id,
            properties = record.state.properties.len(),
            "Backup written"
        );
        Ok(())
    }

    /// Read the backup for a document, if one exists
    pub async fn load(&self, document_id: &DocumentId) -> Result<Option<BackupRecord>> {
        let Some(content) = self.storage.get(&backup_key(document_id)).await? else {
            return Ok(None);
        };

        let record: BackupRecord = serde_json::from_str(&content)?;
        if record.format_version != BACKUP_FORMAT_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "unsupported backup version {}",
                record.format_version
            )));
        }
        if &record.document_id != document_id || record.state.document_id != *document_id {
            return Err(StoreError::InvalidFormat(format!(
                "backup for {} stored under {}",
                record.document_id, document_id
            )));
        }
        Ok(Some(record))
    }

    /// Delete the backup for a document
    pub async fn discard(&self, document_id: &DocumentId) -> Result<()> {
        self.storage.delete(&backup_key(document_id)).await?;
        tracing::debug!(document_id = %document_id, "Backup discarded");
        Ok(())
    }

    /// Find a backup worth offering to the user.
    ///
    /// A backup qualifies when it holds unsaved edits and, if the server data
    /// was confirmed at `confirmed_at`, was written after that point. An
    /// unreadable backup is logged and treated as absent.
    pub async fn find_recoverable(
        &self,
        document_id: &DocumentId,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Option<BackupRecord> {
        if !self.enabled {
            return None;
        }

        let record = match self.load(document_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(document_id = %document_id, "Ignoring unreadable backup: {}", e);
                return None;
            }
        };

        if !record.has_unsaved_changes() {
            return None;
        }
        if let Some(confirmed_at) = confirmed_at {
            if record.timestamp <= confirmed_at {
                return None;
            }
        }
        Some(record)
    }

    /// Rebuild a store from a backup by direct assignment
    pub fn restore(&self, record: BackupRecord) -> Result<EntityStore> {
        let document_id = record.document_id.clone();
        let store = EntityStore::from_working_state(record.state)?;
        tracing::info!(document_id = %document_id, "Working state restored from backup");
        Ok(store)
    }
}
