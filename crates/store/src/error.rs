//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Backup does not describe a valid working state: {0}")]
    InvalidBackup(#[from] edit_engine::EngineError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
