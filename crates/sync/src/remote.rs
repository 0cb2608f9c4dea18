//! Contracts for the two remote procedures the editor depends on

use edit_engine::PropertyDiff;
use property_model::{DocumentId, OptionId, Property, PropertyId, PropertyOption, PropertyRecord};
use serde::{Deserialize, Serialize};

/// Why the transport rejected the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// No session at all
    SessionMissing,
    /// The session expired; a token refresh may have succeeded
    SessionExpired,
    /// The session expired and could not be refreshed
    RefreshFailed,
}

/// Payload of the save procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub document_id: DocumentId,
    pub properties: Vec<Property>,
    pub options: Vec<PropertyOption>,
    pub deleted_property_ids: Vec<PropertyId>,
    pub deleted_option_ids: Vec<OptionId>,
}

impl SaveRequest {
    pub fn from_diff(document_id: DocumentId, diff: PropertyDiff) -> Self {
        Self {
            document_id,
            properties: diff.properties_to_save,
            options: diff.options_to_save,
            deleted_property_ids: diff.deleted_property_ids,
            deleted_option_ids: diff.deleted_option_ids,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub auth_error: Option<AuthErrorKind>,
    /// Transport hint; when absent the message decides
    #[serde(default)]
    pub retryable: Option<bool>,
}

impl SaveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_auth_error(mut self, kind: AuthErrorKind) -> Self {
        self.auth_error = Some(kind);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

/// Result of the fetch procedure.
///
/// A response with neither properties nor an error is malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub properties: Option<Vec<PropertyRecord>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FetchResponse {
    pub fn ok(properties: Vec<PropertyRecord>) -> Self {
        Self {
            properties: Some(properties),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            properties: None,
            error: Some(error.into()),
        }
    }
}

/// The persistence backend.
///
/// `save_properties` must apply a request atomically: every listed property
/// and option is upserted, every listed id is deleted, nothing else changes.
#[trait_variant::make(Send)]
pub trait PropertyRemote: Send + Sync {
    /// Fetch the authoritative record set for a document
    async fn fetch_properties(&self, document_id: &DocumentId) -> FetchResponse;

    /// Persist a diff
    async fn save_properties(&self, request: SaveRequest) -> SaveResponse;
}

impl<T: PropertyRemote> PropertyRemote for std::sync::Arc<T> {
    async fn fetch_properties(&self, document_id: &DocumentId) -> FetchResponse {
        (**self).fetch_properties(document_id).await
    }

    async fn save_properties(&self, request: SaveRequest) -> SaveResponse {
        (**self).save_properties(request).await
    }
}
