//! Open sessions, keyed by document

use crate::session::{EditorSession, Result};
use chrono::{DateTime, Utc};
use property_model::DocumentId;
use std::collections::HashMap;
use std::sync::Arc;
use store::BackupStorage;
use sync::{PropertyRemote, SaveCoordinator};
use tokio::sync::Mutex;

pub type SessionHandle<R, S> = Arc<Mutex<EditorSession<R, S>>>;

/// Every open editor session, plus when each closed document's server data
/// was last confirmed
pub struct SessionRegistry<R, S> {
    coordinator: Arc<SaveCoordinator<R, S>>,
    sessions: Mutex<HashMap<DocumentId, SessionHandle<R, S>>>,
    confirmed: Mutex<HashMap<DocumentId, DateTime<Utc>>>,
}

impl<R: PropertyRemote, S: BackupStorage> SessionRegistry<R, S> {
    pub fn new(coordinator: SaveCoordinator<R, S>) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            sessions: Mutex::new(HashMap::new()),
            confirmed: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<SaveCoordinator<R, S>> {
        &self.coordinator
    }

    /// Open a document, or return its session if it is already open
    pub async fn open(&self, document_id: DocumentId) -> Result<SessionHandle<R, S>> {
        if let Some(session) = self.sessions.lock().await.get(&document_id) {
            return Ok(session.clone());
        }

        let confirmed_at = self.confirmed.lock().await.get(&document_id).copied();
        let session =
            EditorSession::open(document_id.clone(), self.coordinator.clone(), confirmed_at).await?;
        let handle = Arc::new(Mutex::new(session));

        // Another caller may have opened the same document meanwhile
        let mut sessions = self.sessions.lock().await;
        let handle = sessions.entry(document_id).or_insert(handle).clone();
        Ok(handle)
    }

    pub async fn get(&self, document_id: &DocumentId) -> Option<SessionHandle<R, S>> {
        self.sessions.lock().await.get(document_id).cloned()
    }

    /// Close a document. Returns false if it was not open.
    pub async fn close(&self, document_id: &DocumentId) -> bool {
        let Some(handle) = self.sessions.lock().await.remove(document_id) else {
            return false;
        };

        let session = match Arc::try_unwrap(handle) {
            Ok(mutex) => mutex.into_inner(),
            Err(handle) => {
                tracing::warn!(
                    document_id = %document_id,
                    "Session still in use, closing without final backup"
                );
                drop(handle);
                return true;
            }
        };

        if let Some(confirmed_at) = session.close().await {
            self.confirmed
                .lock()
                .await
                .insert(document_id.clone(), confirmed_at);
        }
        true
    }

    pub async fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
