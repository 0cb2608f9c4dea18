//! Diff payload extracted from the entity store

use property_model::{OptionId, Property, PropertyId, PropertyOption};
use serde::{Deserialize, Serialize};

/// Everything needed to bring the server in line with the working set.
///
/// Each save transmits the complete diff rather than an increment, so
/// resending the same diff is harmless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDiff {
    /// Every property in the working set, in display order
    pub properties_to_save: Vec<Property>,
    /// Every option in the working set, grouped by property in display order
    pub options_to_save: Vec<PropertyOption>,
    pub deleted_property_ids: Vec<PropertyId>,
    pub deleted_option_ids: Vec<OptionId>,
}

impl PropertyDiff {
    /// True when there is nothing to upsert and nothing to delete
    pub fn is_empty(&self) -> bool {
        self.properties_to_save.is_empty()
            && self.options_to_save.is_empty()
            && self.deleted_property_ids.is_empty()
            && self.deleted_option_ids.is_empty()
    }

    pub fn property_ids(&self) -> Vec<PropertyId> {
        self.properties_to_save.iter().map(|p| p.id.clone()).collect()
    }

    pub fn option_ids(&self) -> Vec<OptionId> {
        self.options_to_save.iter().map(|o| o.id.clone()).collect()
    }
}
