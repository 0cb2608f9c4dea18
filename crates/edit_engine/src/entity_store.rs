//! Entity store: working copies of properties and options tracked against a baseline
//!
//! The store holds three things for one document:
//!
//! - the working set (properties, per-property option maps, display order)
//! - the baseline, the last snapshot the server confirmed
//! - deletion tracking for entities that exist server-side but were removed locally
//!
//! All mutations are synchronous. Edits against ids that no longer exist are
//! silent no-ops, so a stale UI action never corrupts the working set.

use crate::conflict::DataConflict;
use crate::diff::PropertyDiff;
use chrono::{DateTime, Utc};
use property_model::{
    DocumentId, LocalizedText, OptionId, Property, PropertyFields, PropertyId, PropertyOption,
    PropertyRecord,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Working state of the property editor for a single document.
#[derive(Debug, Clone)]
pub struct EntityStore {
    pub(crate) document_id: DocumentId,
    pub(crate) properties: HashMap<PropertyId, Property>,
    pub(crate) options: HashMap<PropertyId, HashMap<OptionId, PropertyOption>>,
    /// Property display order; authoritative over `Property::display_order`
    pub(crate) sorting: HashMap<PropertyId, u32>,
    pub(crate) baseline: Vec<PropertyRecord>,
    pub(crate) baseline_property_ids: HashSet<PropertyId>,
    pub(crate) baseline_option_ids: HashSet<OptionId>,
    pub(crate) baseline_loaded_at: Option<DateTime<Utc>>,
    pub(crate) deleted_property_ids: BTreeSet<PropertyId>,
    pub(crate) deleted_option_ids: BTreeSet<OptionId>,
    pub(crate) has_changed: bool,
    pub(crate) revision: u64,
    pub(crate) conflict: Option<DataConflict>,
}

impl EntityStore {
    /// Create an empty store that has not been set up yet
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            properties: HashMap::new(),
            options: HashMap::new(),
            sorting: HashMap::new(),
            baseline: Vec::new(),
            baseline_property_ids: HashSet::new(),
            baseline_option_ids: HashSet::new(),
            baseline_loaded_at: None,
            deleted_property_ids: BTreeSet::new(),
            deleted_option_ids: BTreeSet::new(),
            has_changed: false,
            revision: 0,
            conflict: None,
        }
    }

    /// Create a store seeded with a server snapshot
    pub fn with_baseline(document_id: DocumentId, records: Vec<PropertyRecord>) -> Self {
        let mut store = Self::new(document_id);
        store.setup(records);
        store
    }

    // ========== Setup ==========

    /// Replace the whole working state with a fresh, trusted baseline.
    ///
    /// Clears the dirty flag, both deletion sets and any pending conflict.
    /// Display orders are normalized to dense ranks.
    pub fn setup(&mut self, records: Vec<PropertyRecord>) {
        let records = normalize_records(records);

        self.properties.clear();
        self.options.clear();
        self.sorting.clear();
        self.baseline_property_ids.clear();
        self.baseline_option_ids.clear();

        for record in &records {
            let property_id = record.property.id.clone();
            self.sorting
                .insert(property_id.clone(), record.property.display_order);
            self.properties
                .insert(property_id.clone(), record.property.clone());
            self.baseline_property_ids.insert(property_id.clone());

            let option_map = self.options.entry(property_id).or_default();
            for option in &record.options {
                self.baseline_option_ids.insert(option.id.clone());
                option_map.insert(option.id.clone(), option.clone());
            }
        }

        self.baseline = records;
        self.baseline_loaded_at = Some(Utc::now());
        self.deleted_property_ids.clear();
        self.deleted_option_ids.clear();
        self.has_changed = false;
        self.conflict = None;
        self.revision += 1;

        tracing::debug!(
            document_id = %self.document_id,
            properties = self.properties.len(),
            "Entity store set up from baseline"
        );
    }

    /// Adopt the snapshot that follows our own save without discarding
    /// edits made while the save was in flight.
    ///
    /// `saved` is the diff that was sent. The working maps win over the
    /// snapshot for every entity they hold, and entities the snapshot
    /// confirms lose `is_new`. Saved temporaries the server stored under a
    /// new id are replaced by the server's copy. Local deletions stay tracked
    /// while the server still has the entity. Anything else only the server
    /// knows about is inserted at its server position. No conflict is raised
    /// and the store stays dirty.
    pub fn rebaseline(&mut self, records: Vec<PropertyRecord>, saved: &PropertyDiff) {
        let records = normalize_records(records);
        let fresh_property_ids: HashSet<PropertyId> =
            records.iter().map(|r| r.property.id.clone()).collect();
        let fresh_option_ids: HashSet<OptionId> = records
            .iter()
            .flat_map(|r| r.options.iter().map(|o| o.id.clone()))
            .collect();
        let saved_property_ids: HashSet<PropertyId> = saved.property_ids().into_iter().collect();
        let saved_option_ids: HashSet<OptionId> = saved.option_ids().into_iter().collect();

        let remapped: Vec<PropertyId> = self
            .properties
            .keys()
            .filter(|id| {
                id.is_temporary()
                    && saved_property_ids.contains(*id)
                    && !fresh_property_ids.contains(*id)
            })
            .cloned()
            .collect();
        for id in &remapped {
            self.properties.remove(id);
            self.sorting.remove(id);
            self.options.remove(id);
        }
        let mut remapped_options = 0usize;
        for option_map in self.options.values_mut() {
            let before = option_map.len();
            option_map.retain(|id, _| {
                !(id.is_temporary() && saved_option_ids.contains(id) && !fresh_option_ids.contains(id))
            });
            remapped_options += before - option_map.len();
        }
        if !remapped.is_empty() || remapped_options > 0 {
            tracing::warn!(
                document_id = %self.document_id,
                properties = remapped.len(),
                options = remapped_options,
                "Server assigned new ids to saved entities, adopting its copies"
            );
        }

        let known_property_ids: HashSet<PropertyId> = self
            .deleted_property_ids
            .iter()
            .cloned()
            .chain(saved_property_ids)
            .collect();
        let known_option_ids: HashSet<OptionId> = self
            .deleted_option_ids
            .iter()
            .cloned()
            .chain(saved_option_ids)
            .collect();

        let mut deleted_property_ids = BTreeSet::new();
        let mut deleted_option_ids = BTreeSet::new();
        let mut ordered = self.sorted_property_ids();

        for record in &records {
            let property_id = &record.property.id;
            if let Some(property) = self.properties.get_mut(property_id) {
                property.is_new = false;
                let option_map = self.options.entry(property_id.clone()).or_default();
                let mut option_order = sorted_option_ids(option_map);
                for option in &record.options {
                    if let Some(local) = option_map.get_mut(&option.id) {
                        local.is_new = false;
                    } else if known_option_ids.contains(&option.id) {
                        deleted_option_ids.insert(option.id.clone());
                    } else {
                        option_map.insert(option.id.clone(), option.clone());
                        let position = (option.display_order as usize).min(option_order.len());
                        option_order.insert(position, option.id.clone());
                    }
                }
                renumber_options(option_map, &option_order);
            } else if known_property_ids.contains(property_id) {
                deleted_property_ids.insert(property_id.clone());
                for option in &record.options {
                    if known_option_ids.contains(&option.id) {
                        deleted_option_ids.insert(option.id.clone());
                    }
                }
            } else {
                self.properties
                    .insert(property_id.clone(), record.property.clone());
                self.sorting
                    .insert(property_id.clone(), record.property.display_order);
                self.options.insert(
                    property_id.clone(),
                    record
                        .options
                        .iter()
                        .map(|option| (option.id.clone(), option.clone()))
                        .collect(),
                );
                let position = (record.property.display_order as usize).min(ordered.len());
                ordered.insert(position, property_id.clone());
            }
        }
        self.renumber_properties(&ordered);

        self.baseline_property_ids = fresh_property_ids;
        self.baseline_option_ids = fresh_option_ids;
        self.baseline = records;
        self.baseline_loaded_at = Some(Utc::now());
        self.deleted_property_ids = deleted_property_ids;
        self.deleted_option_ids = deleted_option_ids;
        self.conflict = None;
        self.touch();

        tracing::debug!(
            document_id = %self.document_id,
            properties = self.properties.len(),
            "Entity store rebaselined with edits kept"
        );
    }

    // ========== Property Mutations ==========

    /// Add a new, not yet persisted property at the end of the order
    pub fn add_property(&mut self, fields: PropertyFields) -> PropertyId {
        let id = PropertyId::temporary();
        let display_order = self.properties.len() as u32;

        let mut property = Property::new(id.clone(), fields, display_order);
        property.is_new = true;

        self.properties.insert(id.clone(), property);
        self.sorting.insert(id.clone(), display_order);
        self.options.insert(id.clone(), HashMap::new());
        self.touch();
        id
    }

    /// Apply a mutation to a property's writable fields.
    ///
    /// Returns false (and changes nothing) if the property is absent.
    pub fn update_property<F>(&mut self, id: &PropertyId, mutator: F) -> bool
    where
        F: FnOnce(&mut PropertyFields),
    {
        let Some(property) = self.properties.get_mut(id) else {
            return false;
        };
        mutator(&mut property.fields);
        self.touch();
        true
    }

    /// Delete a property and cascade to its options.
    ///
    /// Persisted entities are recorded in the deletion sets; never-persisted
    /// ones are simply dropped.
    pub fn delete_property(&mut self, id: &PropertyId) -> bool {
        if self.properties.remove(id).is_none() {
            return false;
        }
        self.sorting.remove(id);

        if self.baseline_property_ids.contains(id) {
            self.deleted_property_ids.insert(id.clone());
        }

        if let Some(option_map) = self.options.remove(id) {
            for option_id in option_map.into_keys() {
                if self.baseline_option_ids.contains(&option_id) {
                    self.deleted_option_ids.insert(option_id);
                }
            }
        }

        let ordered = self.sorted_property_ids();
        self.renumber_properties(&ordered);
        self.touch();
        true
    }

    /// Move the property at `from` to position `to`.
    ///
    /// No-op when either index is out of range or both are equal.
    pub fn reorder_properties(&mut self, from: usize, to: usize) -> bool {
        let mut ordered = self.sorted_property_ids();
        if from >= ordered.len() || to >= ordered.len() || from == to {
            return false;
        }
        let moved = ordered.remove(from);
        ordered.insert(to, moved);
        self.renumber_properties(&ordered);
        self.touch();
        true
    }

    // ========== Option Mutations ==========

    /// Add a new option at the end of a property's option list.
    ///
    /// Returns `None` if the property is absent.
    pub fn add_property_option(
        &mut self,
        property_id: &PropertyId,
        name: Option<LocalizedText>,
    ) -> Option<OptionId> {
        if !self.properties.contains_key(property_id) {
            return None;
        }
        let option_map = self.options.entry(property_id.clone()).or_default();
        let id = OptionId::temporary();
        let mut option = PropertyOption::new(
            id.clone(),
            property_id.clone(),
            name.unwrap_or_default(),
            option_map.len() as u32,
        );
        option.is_new = true;
        option_map.insert(id.clone(), option);
        self.touch();
        Some(id)
    }

    /// Apply a mutation to an option's name
    pub fn update_property_option<F>(
        &mut self,
        property_id: &PropertyId,
        option_id: &OptionId,
        mutator: F,
    ) -> bool
    where
        F: FnOnce(&mut LocalizedText),
    {
        let Some(option) = self
            .options
            .get_mut(property_id)
            .and_then(|options| options.get_mut(option_id))
        else {
            return false;
        };
        mutator(&mut option.name);
        self.touch();
        true
    }

    /// Delete a single option. The owning property is never affected.
    pub fn delete_property_option(&mut self, property_id: &PropertyId, option_id: &OptionId) -> bool {
        let Some(option_map) = self.options.get_mut(property_id) else {
            return false;
        };
        if option_map.remove(option_id).is_none() {
            return false;
        }
        if self.baseline_option_ids.contains(option_id) {
            self.deleted_option_ids.insert(option_id.clone());
        }
        let ordered = sorted_option_ids(option_map);
        renumber_options(option_map, &ordered);
        self.touch();
        true
    }

    /// Move the option at `from` to position `to` within one property
    pub fn reorder_property_options(&mut self, property_id: &PropertyId, from: usize, to: usize) -> bool {
        let Some(option_map) = self.options.get_mut(property_id) else {
            return false;
        };
        let mut ordered = sorted_option_ids(option_map);
        if from >= ordered.len() || to >= ordered.len() || from == to {
            return false;
        }
        let moved = ordered.remove(from);
        ordered.insert(to, moved);
        renumber_options(option_map, &ordered);
        self.touch();
        true
    }

    // ========== Diff ==========

    /// Snapshot everything that must be sent to persist the working set.
    ///
    /// Pure query; display orders in the result are dense ranks.
    pub fn extract_diff(&self) -> PropertyDiff {
        let ordered = self.sorted_property_ids();

        let mut properties_to_save = Vec::with_capacity(ordered.len());
        let mut options_to_save = Vec::new();

        for (index, property_id) in ordered.iter().enumerate() {
            let Some(property) = self.properties.get(property_id) else {
                continue;
            };
            let mut property = property.clone();
            property.display_order = index as u32;
            properties_to_save.push(property);

            for (option_index, option) in self.ordered_options(property_id).into_iter().enumerate() {
                let mut option = option.clone();
                option.property_id = property_id.clone();
                option.display_order = option_index as u32;
                options_to_save.push(option);
            }
        }

        PropertyDiff {
            properties_to_save,
            options_to_save,
            deleted_property_ids: self.deleted_property_ids.iter().cloned().collect(),
            deleted_option_ids: self.deleted_option_ids.iter().cloned().collect(),
        }
    }

    // ========== Accessors ==========

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Properties in display order
    pub fn ordered_properties(&self) -> Vec<&Property> {
        self.sorted_property_ids()
            .iter()
            .filter_map(|id| self.properties.get(id))
            .collect()
    }

    pub fn property(&self, id: &PropertyId) -> Option<&Property> {
        self.properties.get(id)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Options of a property in display order (empty if the property is absent)
    pub fn ordered_options(&self, property_id: &PropertyId) -> Vec<&PropertyOption> {
        let Some(option_map) = self.options.get(property_id) else {
            return Vec::new();
        };
        let mut options: Vec<&PropertyOption> = option_map.values().collect();
        options.sort_by(|a, b| (a.display_order, &a.id).cmp(&(b.display_order, &b.id)));
        options
    }

    pub fn option(&self, property_id: &PropertyId, option_id: &OptionId) -> Option<&PropertyOption> {
        self.options.get(property_id)?.get(option_id)
    }

    /// Whether the working set has unsaved local edits
    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    /// Counter bumped by every effective mutation and by setup
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the store has ever received a baseline
    pub fn is_loaded(&self) -> bool {
        self.baseline_loaded_at.is_some()
    }

    pub fn baseline(&self) -> &[PropertyRecord] {
        &self.baseline
    }

    /// When the current baseline was last confirmed by the server
    pub fn baseline_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.baseline_loaded_at
    }

    pub fn deleted_property_ids(&self) -> impl Iterator<Item = &PropertyId> {
        self.deleted_property_ids.iter()
    }

    pub fn deleted_option_ids(&self) -> impl Iterator<Item = &OptionId> {
        self.deleted_option_ids.iter()
    }

    // ========== Internal Helpers ==========

    fn touch(&mut self) {
        self.has_changed = true;
        self.revision += 1;
    }

    pub(crate) fn sorted_property_ids(&self) -> Vec<PropertyId> {
        let mut entries: Vec<(&PropertyId, u32)> =
            self.sorting.iter().map(|(id, order)| (id, *order)).collect();
        entries.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn renumber_properties(&mut self, ordered: &[PropertyId]) {
        for (index, id) in ordered.iter().enumerate() {
            let order = index as u32;
            self.sorting.insert(id.clone(), order);
            if let Some(property) = self.properties.get_mut(id) {
                property.display_order = order;
            }
        }
    }
}

pub(crate) fn sorted_option_ids(option_map: &HashMap<OptionId, PropertyOption>) -> Vec<OptionId> {
    let mut entries: Vec<&PropertyOption> = option_map.values().collect();
    entries.sort_by(|a, b| (a.display_order, &a.id).cmp(&(b.display_order, &b.id)));
    entries.into_iter().map(|option| option.id.clone()).collect()
}

pub(crate) fn renumber_options(option_map: &mut HashMap<OptionId, PropertyOption>, ordered: &[OptionId]) {
    for (index, id) in ordered.iter().enumerate() {
        if let Some(option) = option_map.get_mut(id) {
            option.display_order = index as u32;
        }
    }
}

/// Bring a server snapshot into canonical form.
///
/// Records are sorted by (display order, id) and renumbered densely, duplicate
/// ids are dropped (first wins), lifecycle flags are cleared and every option
/// is re-parented to the record that embeds it.
pub(crate) fn normalize_records(records: Vec<PropertyRecord>) -> Vec<PropertyRecord> {
    let mut seen_properties = HashSet::new();
    let mut seen_options = HashSet::new();

    let mut records: Vec<PropertyRecord> = records
        .into_iter()
        .filter(|record| seen_properties.insert(record.property.id.clone()))
        .collect();
    records.sort_by(|a, b| {
        (a.property.display_order, &a.property.id).cmp(&(b.property.display_order, &b.property.id))
    });

    for (index, record) in records.iter_mut().enumerate() {
        record.property.display_order = index as u32;
        record.property.is_new = false;

        let property_id = record.property.id.clone();
        record
            .options
            .retain(|option| seen_options.insert(option.id.clone()));
        record
            .options
            .sort_by(|a, b| (a.display_order, &a.id).cmp(&(b.display_order, &b.id)));
        for (option_index, option) in record.options.iter_mut().enumerate() {
            option.display_order = option_index as u32;
            option.property_id = property_id.clone();
            option.is_new = false;
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use property_model::{PropertyType, TextMetadata};

    #[test]
    fn test_new_store_is_empty_and_unloaded() {
        let store = EntityStore::new(doc_id());
        assert_eq!(store.property_count(), 0);
        assert!(!store.has_changed());
        assert!(!store.is_loaded());
        assert!(store.extract_diff().is_empty());
    }

    #[test]
    fn test_setup_normalizes_orders_and_flags() {
        let mut a = record("a", 7, &[]);
        a.property.is_new = true;
        let b = record("b", 2, &["b1", "b2"]);
        let store = EntityStore::with_baseline(doc_id(), vec![a, b]);

        let ordered: Vec<&str> = store.ordered_properties().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ordered, vec!["b", "a"]);
        assert_eq!(store.property(&pid("a")).unwrap().display_order, 1);
        assert!(!store.property(&pid("a")).unwrap().is_new);
        assert!(!store.has_changed());
        assert!(store.is_loaded());
    }

    #[test]
    fn test_setup_drops_duplicate_ids() {
        let store = EntityStore::with_baseline(
            doc_id(),
            vec![record("a", 0, &["x"]), record("a", 1, &[]), record("b", 2, &["x"])],
        );
        assert_eq!(store.property_count(), 2);
        assert_eq!(store.extract_diff().options_to_save.len(), 1);
    }

    #[test]
    fn test_setup_clears_edits_and_deletions() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &["a1"])]);
        store.delete_property(&pid("a"));
        store.add_property(text_fields("New"));
        assert!(store.has_changed());

        store.setup(vec![record("z", 0, &[])]);
        let diff = store.extract_diff();
        assert!(!store.has_changed());
        assert!(diff.deleted_property_ids.is_empty());
        assert!(diff.deleted_option_ids.is_empty());
        assert_eq!(diff.property_ids(), vec![pid("z")]);
    }

    #[test]
    fn test_rebaseline_keeps_edits_without_conflict() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &["a1"])]);
        let first = store.add_property(text_fields("First"));
        let saved = store.extract_diff();

        // Edits made after the diff was taken
        store.update_property(&first, |fields| fields.name.set("en", "Edited"));
        let late = store.add_property(text_fields("Late"));

        let mut server = record("a", 0, &["a1"]);
        server.property.fields.name.set("en", "A");
        let mut saved_first = saved.properties_to_save[1].clone();
        saved_first.is_new = false;
        store.rebaseline(
            vec![server, PropertyRecord::new(saved_first, vec![])],
            &saved,
        );

        assert!(!store.has_data_conflict());
        assert!(store.has_changed());
        let first_now = store.property(&first).unwrap();
        assert!(!first_now.is_new);
        assert_eq!(first_now.fields.name.get("en"), Some("Edited"));
        assert!(store.property(&late).unwrap().is_new);
        let baseline_ids: Vec<PropertyId> =
            store.baseline().iter().map(|r| r.property.id.clone()).collect();
        assert_eq!(baseline_ids, vec![pid("a"), first.clone()]);
        assert_eq!(
            store.extract_diff().property_ids(),
            vec![pid("a"), first, late]
        );
    }

    #[test]
    fn test_rebaseline_adopts_server_ids_for_saved_temporaries() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![]);
        let color = store.add_property(text_fields("Color"));
        store.add_property_option(&color, None).unwrap();
        let saved = store.extract_diff();
        let late = store.add_property(text_fields("Late"));

        store.rebaseline(vec![record("prop-1", 0, &["opt-1"])], &saved);

        assert!(store.property(&color).is_none());
        let adopted = store.property(&pid("prop-1")).unwrap();
        assert!(!adopted.is_new);
        assert_eq!(adopted.display_order, 0);
        assert_eq!(store.ordered_options(&pid("prop-1")).len(), 1);
        assert_eq!(store.property(&late).unwrap().display_order, 1);

        let diff = store.extract_diff();
        assert_eq!(diff.property_ids(), vec![pid("prop-1"), late]);
        assert_eq!(diff.option_ids(), vec![oid("opt-1")]);
        assert!(diff.deleted_property_ids.is_empty());
    }

    #[test]
    fn test_rebaseline_tracks_saved_then_deleted_entities() {
        let mut store = EntityStore::with_baseline(
            doc_id(),
            vec![record("a", 0, &["a1", "a2"]), record("b", 1, &[])],
        );
        let added = store.add_property(text_fields("Added"));
        let saved = store.extract_diff();

        store.delete_property(&added);
        store.delete_property(&pid("b"));
        store.delete_property_option(&pid("a"), &oid("a2"));

        let mut added_record = PropertyRecord::new(saved.properties_to_save[2].clone(), vec![]);
        added_record.property.is_new = false;
        store.rebaseline(
            vec![record("a", 0, &["a1", "a2"]), record("b", 1, &[]), added_record],
            &saved,
        );

        let diff = store.extract_diff();
        assert_eq!(diff.property_ids(), vec![pid("a")]);
        let mut deleted = diff.deleted_property_ids.clone();
        deleted.sort();
        let mut expected = vec![pid("b"), added];
        expected.sort();
        assert_eq!(deleted, expected);
        assert_eq!(diff.deleted_option_ids, vec![oid("a2")]);
    }

    #[test]
    fn test_rebaseline_drops_deletions_the_server_applied() {
        let mut store =
            EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[]), record("b", 1, &["b1"])]);
        store.delete_property(&pid("b"));
        let saved = store.extract_diff();
        store.update_property(&pid("a"), |fields| fields.required = true);

        store.rebaseline(vec![record("a", 0, &[]), record("c", 1, &[])], &saved);

        let diff = store.extract_diff();
        assert!(diff.deleted_property_ids.is_empty());
        assert!(diff.deleted_option_ids.is_empty());
        assert_eq!(diff.property_ids(), vec![pid("a"), pid("c")]);
        assert!(store.property(&pid("a")).unwrap().fields.required);
    }

    #[test]
    fn test_add_property_appends_new_entry() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[])]);
        let id = store.add_property(text_fields("Weight"));

        let property = store.property(&id).unwrap();
        assert!(property.is_new);
        assert!(id.is_temporary());
        assert_eq!(property.display_order, 1);
        assert!(store.has_changed());
    }

    #[test]
    fn test_update_property_mutates_fields() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[])]);
        let updated = store.update_property(&pid("a"), |fields| {
            fields.name.set("en", "Renamed");
            fields.required = true;
            fields.property_type = PropertyType::Text(TextMetadata {
                max_length: Some(10),
                multiline: true,
            });
        });

        assert!(updated);
        let property = store.property(&pid("a")).unwrap();
        assert_eq!(property.fields.name.get("en"), Some("Renamed"));
        assert!(property.fields.required);
        assert!(store.has_changed());
    }

    #[test]
    fn test_update_missing_property_is_silent_noop() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[])]);
        let revision = store.revision();
        assert!(!store.update_property(&pid("gone"), |fields| fields.locked = true));
        assert!(!store.has_changed());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_delete_persisted_property_cascades_to_options() {
        let mut store = EntityStore::with_baseline(
            doc_id(),
            vec![record("color", 0, &["red", "blue"]), record("size", 1, &[])],
        );
        let local_option = store.add_property_option(&pid("color"), None).unwrap();

        assert!(store.delete_property(&pid("color")));
        let diff = store.extract_diff();

        assert_eq!(diff.deleted_property_ids, vec![pid("color")]);
        assert_eq!(diff.deleted_option_ids, vec![oid("blue"), oid("red")]);
        assert!(!diff.deleted_option_ids.contains(&local_option));
        assert!(diff.options_to_save.is_empty());
        assert_eq!(store.property(&pid("size")).unwrap().display_order, 0);
    }

    #[test]
    fn test_delete_new_property_leaves_no_record() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[])]);
        let id = store.add_property(text_fields("Temp"));
        store.add_property_option(&id, None);

        assert!(store.delete_property(&id));
        let diff = store.extract_diff();
        assert!(diff.deleted_property_ids.is_empty());
        assert!(diff.deleted_option_ids.is_empty());
        assert_eq!(diff.property_ids(), vec![pid("a")]);
    }

    #[test]
    fn test_delete_missing_property_is_noop() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[])]);
        assert!(!store.delete_property(&pid("missing")));
        assert!(!store.has_changed());
    }

    #[test]
    fn test_reorder_properties_moves_and_renumbers() {
        let mut store = EntityStore::with_baseline(
            doc_id(),
            vec![record("a", 0, &[]), record("b", 1, &[]), record("c", 2, &[])],
        );
        assert!(store.reorder_properties(0, 2));

        let diff = store.extract_diff();
        assert_eq!(diff.property_ids(), vec![pid("b"), pid("c"), pid("a")]);
        let orders: Vec<u32> = diff.properties_to_save.iter().map(|p| p.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(store.property(&pid("a")).unwrap().display_order, 2);
    }

    #[test]
    fn test_reorder_out_of_range_or_equal_is_noop() {
        let mut store =
            EntityStore::with_baseline(doc_id(), vec![record("a", 0, &[]), record("b", 1, &[])]);
        assert!(!store.reorder_properties(0, 5));
        assert!(!store.reorder_properties(5, 0));
        assert!(!store.reorder_properties(1, 1));
        assert!(!store.has_changed());
    }

    #[test]
    fn test_option_lifecycle() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("color", 0, &["red"])]);

        let green = store
            .add_property_option(&pid("color"), Some(LocalizedText::new().with("en", "Green")))
            .unwrap();
        assert!(store.option(&pid("color"), &green).unwrap().is_new);
        assert_eq!(store.option(&pid("color"), &green).unwrap().display_order, 1);

        assert!(store.update_property_option(&pid("color"), &oid("red"), |name| {
            name.set("en", "Crimson");
        }));
        assert!(store.delete_property_option(&pid("color"), &oid("red")));

        let diff = store.extract_diff();
        assert_eq!(diff.deleted_option_ids, vec![oid("red")]);
        assert_eq!(diff.options_to_save.len(), 1);
        assert_eq!(diff.options_to_save[0].id, green);
        assert_eq!(diff.options_to_save[0].display_order, 0);
        // Deleting the last persisted option keeps the property
        assert!(store.property(&pid("color")).is_some());
    }

    #[test]
    fn test_add_option_to_missing_property_is_noop() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![]);
        assert!(store.add_property_option(&pid("nope"), None).is_none());
        assert!(!store.update_property_option(&pid("nope"), &oid("x"), |_| {}));
        assert!(!store.delete_property_option(&pid("nope"), &oid("x")));
        assert!(!store.has_changed());
    }

    #[test]
    fn test_reorder_property_options() {
        let mut store =
            EntityStore::with_baseline(doc_id(), vec![record("color", 0, &["o1", "o2", "o3"])]);
        assert!(store.reorder_property_options(&pid("color"), 2, 0));

        let names: Vec<&str> = store
            .ordered_options(&pid("color"))
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(names, vec!["o3", "o1", "o2"]);
        assert!(!store.reorder_property_options(&pid("color"), 0, 3));
    }

    #[test]
    fn test_extract_diff_is_pure() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![record("a", 0, &["a1"])]);
        store.add_property(text_fields("B"));
        let revision = store.revision();

        let first = store.extract_diff();
        let second = store.extract_diff();
        assert_eq!(first, second);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_scenario_pure_add() {
        let mut store = EntityStore::with_baseline(doc_id(), vec![]);
        for name in ["A", "B", "C"] {
            store.add_property(text_fields(name));
        }
        let diff = store.extract_diff();
        assert_eq!(diff.properties_to_save.len(), 3);
        assert!(diff.deleted_property_ids.is_empty());
        assert!(diff.deleted_option_ids.is_empty());
        let names: Vec<&str> = diff
            .properties_to_save
            .iter()
            .map(|p| p.fields.name.get("en").unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_scenario_mixed_edits() {
        let mut store = EntityStore::with_baseline(
            doc_id(),
            vec![
                record("existing-1", 0, &[]),
                record("existing-2", 1, &[]),
                record("to-delete", 2, &[]),
            ],
        );
        store.update_property(&pid("existing-1"), |fields| fields.name.set("en", "Updated"));
        let new_id = store.add_property(text_fields("new-1"));
        store.delete_property(&pid("to-delete"));

        let diff = store.extract_diff();
        assert_eq!(diff.properties_to_save.len(), 3);
        assert_eq!(diff.property_ids(), vec![pid("existing-1"), pid("existing-2"), new_id.clone()]);
        assert_eq!(
            diff.properties_to_save[0].fields.name.get("en"),
            Some("Updated")
        );
        assert!(diff.properties_to_save[2].is_new);
        assert_eq!(diff.deleted_property_ids, vec![pid("to-delete")]);
    }
}
