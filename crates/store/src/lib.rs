//! Store - Local backup, recovery and settings persistence
//!
//! Unsaved working state is written through a [`BackupStorage`] backend so
//! that a crash or a failed save never loses edits. Editor settings live
//! alongside in a JSON file.

mod backup;
mod error;
mod settings;
mod storage;

pub use backup::*;
pub use error::*;
pub use settings::*;
pub use storage::*;
