//! Serializable capture of a store's full working state
//!
//! Used for local backups: a captured state holds unsaved edits, so restoring
//! it assigns the state directly instead of going through `setup`.

use crate::entity_store::{renumber_options, sorted_option_ids, EntityStore};
use crate::{EngineError, Result};
use chrono::{DateTime, Utc};
use property_model::{DocumentId, OptionId, Property, PropertyId, PropertyOption, PropertyRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingState {
    pub document_id: DocumentId,
    /// Properties in display order
    pub properties: Vec<Property>,
    /// Options grouped by property, each group in display order
    pub options: Vec<PropertyOption>,
    pub sorting: BTreeMap<PropertyId, u32>,
    pub deleted_property_ids: Vec<PropertyId>,
    pub deleted_option_ids: Vec<OptionId>,
    pub baseline: Vec<PropertyRecord>,
    pub baseline_loaded_at: Option<DateTime<Utc>>,
    pub has_changed: bool,
}

impl EntityStore {
    /// Capture the current working state
    pub fn working_state(&self) -> WorkingState {
        let properties: Vec<Property> = self.ordered_properties().into_iter().cloned().collect();
        let options = properties
            .iter()
            .flat_map(|property| self.ordered_options(&property.id))
            .cloned()
            .collect();

        WorkingState {
            document_id: self.document_id.clone(),
            properties,
            options,
            sorting: self
                .sorting
                .iter()
                .map(|(id, order)| (id.clone(), *order))
                .collect(),
            deleted_property_ids: self.deleted_property_ids.iter().cloned().collect(),
            deleted_option_ids: self.deleted_option_ids.iter().cloned().collect(),
            baseline: self.baseline.clone(),
            baseline_loaded_at: self.baseline_loaded_at,
            has_changed: self.has_changed,
        }
    }

    /// Build a store by assigning a captured state directly.
    ///
    /// The state is checked against the working-set invariants first; a state
    /// that violates them is rejected rather than partially applied.
    pub fn from_working_state(state: WorkingState) -> Result<Self> {
        validate(&state)?;

        let mut store = EntityStore::new(state.document_id);

        for record in &state.baseline {
            store.baseline_property_ids.insert(record.property.id.clone());
            for option in &record.options {
                store.baseline_option_ids.insert(option.id.clone());
            }
        }

        for property in state.properties {
            let order = state.sorting.get(&property.id).copied().unwrap_or(property.display_order);
            store.sorting.insert(property.id.clone(), order);
            store.options.insert(property.id.clone(), HashMap::new());
            store.properties.insert(property.id.clone(), property);
        }
        let ordered = store.sorted_property_ids();
        store.renumber_properties(&ordered);

        for option in state.options {
            store
                .options
                .entry(option.property_id.clone())
                .or_default()
                .insert(option.id.clone(), option);
        }
        for option_map in store.options.values_mut() {
            let ordered = sorted_option_ids(option_map);
            renumber_options(option_map, &ordered);
        }

        store.baseline = state.baseline;
        store.baseline_loaded_at = state.baseline_loaded_at;
        store.deleted_property_ids = state.deleted_property_ids.into_iter().collect();
        store.deleted_option_ids = state.deleted_option_ids.into_iter().collect();
        store.has_changed = state.has_changed;
        store.revision = 1;

        Ok(store)
    }
}

fn validate(state: &WorkingState) -> Result<()> {
    let mut property_ids = HashSet::new();
    for property in &state.properties {
        if !property_ids.insert(&property.id) {
            return Err(EngineError::DuplicatePropertyId(property.id.clone()));
        }
    }

    for id in state.sorting.keys() {
        if !property_ids.contains(id) {
            return Err(EngineError::SortingMismatch(id.clone()));
        }
    }
    if let Some(missing) = property_ids.iter().find(|id| !state.sorting.contains_key(**id)) {
        return Err(EngineError::SortingMismatch((*missing).clone()));
    }

    let mut option_ids = HashSet::new();
    for option in &state.options {
        if !option_ids.insert(&option.id) {
            return Err(EngineError::DuplicateOptionId(option.id.clone()));
        }
        if !property_ids.contains(&option.property_id) {
            return Err(EngineError::OrphanedOption {
                option_id: option.id.clone(),
                property_id: option.property_id.clone(),
            });
        }
    }

    let deleted_properties: BTreeSet<&PropertyId> = state.deleted_property_ids.iter().collect();
    if let Some(id) = deleted_properties.iter().find(|id| property_ids.contains(**id)) {
        return Err(EngineError::PropertyDeletedAndPresent((*id).clone()));
    }
    if let Some(id) = state.deleted_option_ids.iter().find(|id| option_ids.contains(id)) {
        return Err(EngineError::OptionDeletedAndPresent(id.clone()));
    }

    Ok(())
}
