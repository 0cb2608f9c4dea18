//! Identifiers for documents, properties and options

use crate::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Prefix carried by identifiers minted locally before the server assigns one.
pub const TEMPORARY_ID_PREFIX: &str = "tmp-";

const MAX_DOCUMENT_ID_LEN: usize = 128;

fn document_id_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("document id pattern is valid")
    })
}

/// Identifier of the document (domain) whose properties are being edited.
///
/// Document ids double as local storage keys, so they are restricted to a
/// conservative character set. Construction fails for anything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate and wrap a document id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ModelError::InvalidDocumentId { id, reason: "must not be empty" });
        }
        if id.len() > MAX_DOCUMENT_ID_LEN {
            return Err(ModelError::InvalidDocumentId { id, reason: "longer than 128 characters" });
        }
        if !document_id_pattern().is_match(&id) {
            return Err(ModelError::InvalidDocumentId {
                id,
                reason: "only ASCII letters, digits, '.', '_' and '-' are allowed",
            });
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier issued by the server
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a temporary identifier for a locally created entity
            pub fn temporary() -> Self {
                Self(format!("{}{}", TEMPORARY_ID_PREFIX, Uuid::new_v4()))
            }

            /// Whether this identifier was minted locally
            pub fn is_temporary(&self) -> bool {
                self.0.starts_with(TEMPORARY_ID_PREFIX)
            }

            /// Get the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Opaque identifier of a property, stable once created.
    PropertyId
);

entity_id!(
    /// Opaque identifier of a property option.
    OptionId
);
