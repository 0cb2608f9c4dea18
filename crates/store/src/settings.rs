//! Editor settings management
//!
//! Settings persist as pretty-printed JSON in `<dir>/settings.json`. Every
//! section is defaulted, so a partial or missing file still loads.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    /// Save retry behavior
    pub sync: SyncSettings,
    /// Local backup behavior
    pub backup: BackupSettings,
}

/// Retry behavior for the save RPC
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Factor applied to the delay after each retry
    pub backoff_multiplier: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupSettings {
    /// Whether local backups are written at all
    pub enabled: bool,
    /// Directory for file-backed backups, relative to the data directory
    pub directory: PathBuf,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(".property-backups"),
        }
    }
}

/// Loads, saves and updates [`EditorSettings`]
pub struct SettingsManager {
    settings_path: PathBuf,
    current: EditorSettings,
}

impl SettingsManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join("settings.json"),
            current: EditorSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load settings from disk, or fall back to defaults
    pub async fn load(&mut self) -> Result<&EditorSettings> {
        self.current = match tokio::fs::read_to_string(&self.settings_path).await {
            Ok(content) => parse_or_default(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EditorSettings::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(&self.current)
    }

    /// Load settings synchronously (for use during startup)
    pub fn load_sync(&mut self) -> Result<&EditorSettings> {
        self.current = match std::fs::read_to_string(&self.settings_path) {
            Ok(content) => parse_or_default(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EditorSettings::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(&self.current)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Replace settings and save to disk
    pub async fn update(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    /// Reset settings to defaults and save
    pub async fn reset(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save().await?;
        Ok(&self.current)
    }
}

fn parse_or_default(content: &str) -> EditorSettings {
    serde_json::from_str(content).unwrap_or_else(|e| {
        tracing::warn!("Failed to parse settings file, using defaults: {}", e);
        EditorSettings::default()
    })
}
