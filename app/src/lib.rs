//! Property editor sessions
//!
//! Ties the entity store, save coordinator and backups together into
//! per-document editing sessions.

pub mod session;
pub mod state;

pub use session::{EditorSession, SessionError};
pub use state::{SessionHandle, SessionRegistry};
