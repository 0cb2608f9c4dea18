//! Sync - Saving property edits to the remote
//!
//! The [`SaveCoordinator`] turns an entity store's diff into a save request,
//! retries transient failures with exponential backoff, keeps a local backup
//! while edits are at risk, and re-seeds the baseline after a successful save.
//!
//! Failures are classified into [`SaveError`] variants so callers can tell
//! "try again" apart from "ask the user".

mod coordinator;
mod error;
mod memory_remote;
mod remote;
mod retry;

pub use coordinator::*;
pub use error::*;
pub use memory_remote::MemoryRemote;
pub use remote::*;
pub use retry::RetryPolicy;
