//! Property Model - records edited by the property editor
//!
//! This crate defines the data the working-state engine operates on:
//! validated document ids, opaque property/option ids, localized text,
//! the closed set of property types with their metadata, and the
//! property/option/record shapes exchanged with the server.

mod error;
mod ids;
mod property;
mod property_type;
mod text;

pub use error::*;
pub use ids::*;
pub use property::*;
pub use property_type::*;
pub use text::*;
