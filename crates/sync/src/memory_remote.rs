//! In-process remote for tests and offline sessions

use crate::remote::{FetchResponse, PropertyRemote, SaveRequest, SaveResponse};
use property_model::{DocumentId, OptionId, PropertyId, PropertyRecord};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A remote that keeps each document's records in memory.
///
/// Failures can be scripted: queued responses are returned (in order) before
/// any real work is done. With id remapping on, temporary ids are replaced by
/// server ids the way a database-backed remote assigns them.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    documents: RwLock<HashMap<DocumentId, Vec<PropertyRecord>>>,
    save_failures: Mutex<VecDeque<SaveResponse>>,
    fetch_failures: Mutex<VecDeque<FetchResponse>>,
    save_latency: Option<Duration>,
    remap_ids: bool,
    next_id: AtomicUsize,
    save_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every save by a fixed amount
    pub fn with_save_latency(mut self, latency: Duration) -> Self {
        self.save_latency = Some(latency);
        self
    }

    /// Store new entities under server-assigned ids (`prop-N`, `opt-N`)
    pub fn with_id_remapping(mut self) -> Self {
        self.remap_ids = true;
        self
    }

    /// Replace a document's records
    pub async fn seed(&self, document_id: DocumentId, records: Vec<PropertyRecord>) {
        self.documents.write().await.insert(document_id, records);
    }

    /// The document's records, properties ordered by id
    pub async fn snapshot(&self, document_id: &DocumentId) -> Vec<PropertyRecord> {
        self.documents
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Queue a response to return from the next save instead of saving
    pub async fn fail_next_save(&self, response: SaveResponse) {
        self.save_failures.lock().await.push_back(response);
    }

    /// Queue a response to return from the next fetch
    pub async fn fail_next_fetch(&self, response: FetchResponse) {
        self.fetch_failures.lock().await.push_back(response);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn assign_server_ids(&self, mut request: SaveRequest) -> SaveRequest {
        let mut property_ids = HashMap::new();
        for property in &mut request.properties {
            if property.id.is_temporary() {
                let id = PropertyId::new(format!("prop-{}", self.allocate_id()));
                property_ids.insert(property.id.clone(), id.clone());
                property.id = id;
            }
        }
        for option in &mut request.options {
            if option.id.is_temporary() {
                option.id = OptionId::new(format!("opt-{}", self.allocate_id()));
            }
            if let Some(id) = property_ids.get(&option.property_id) {
                option.property_id = id.clone();
            }
        }
        request
    }

    fn allocate_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl PropertyRemote for MemoryRemote {
    async fn fetch_properties(&self, document_id: &DocumentId) -> FetchResponse {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.fetch_failures.lock().await.pop_front() {
            return response;
        }
        FetchResponse::ok(self.snapshot(document_id).await)
    }

    async fn save_properties(&self, request: SaveRequest) -> SaveResponse {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.save_latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(response) = self.save_failures.lock().await.pop_front() {
            return response;
        }

        let request = if self.remap_ids {
            self.assign_server_ids(request)
        } else {
            request
        };

        let mut documents = self.documents.write().await;
        let current = documents
            .get(&request.document_id)
            .cloned()
            .unwrap_or_default();
        match apply(current, &request) {
            Ok(records) => {
                documents.insert(request.document_id.clone(), records);
                SaveResponse::ok()
            }
            Err(message) => SaveResponse::failed(message).with_retryable(false),
        }
    }
}

/// Apply a request to a record set, or reject it without changes
fn apply(records: Vec<PropertyRecord>, request: &SaveRequest) -> Result<Vec<PropertyRecord>, String> {
    let mut by_id: HashMap<_, _> = records
        .into_iter()
        .map(|record| (record.property.id.clone(), record))
        .collect();

    for property in &request.properties {
        match by_id.get_mut(&property.id) {
            Some(record) => record.property = property.clone(),
            None => {
                by_id.insert(
                    property.id.clone(),
                    PropertyRecord::new(property.clone(), Vec::new()),
                );
            }
        }
    }

    for id in &request.deleted_property_ids {
        by_id.remove(id);
    }

    let deleted_options: HashSet<_> = request.deleted_option_ids.iter().collect();
    let upserted_options: HashSet<_> = request.options.iter().map(|o| &o.id).collect();
    for record in by_id.values_mut() {
        record
            .options
            .retain(|o| !deleted_options.contains(&o.id) && !upserted_options.contains(&o.id));
    }

    for option in &request.options {
        let Some(record) = by_id.get_mut(&option.property_id) else {
            return Err(format!(
                "Option {} references missing property {}",
                option.id, option.property_id
            ));
        };
        record.options.push(option.clone());
    }

    let mut records: Vec<PropertyRecord> = by_id.into_values().collect();
    for record in &mut records {
        record.property.is_new = false;
        for option in &mut record.options {
            option.is_new = false;
        }
        record.options.sort_by_key(|o| o.display_order);
    }
    records.sort_by(|a, b| a.property.id.cmp(&b.property.id));
    Ok(records)
}
