//! Property, option and server record types

use crate::{LocalizedText, OptionId, PropertyId, PropertyType};
use serde::{Deserialize, Serialize};

/// The user-editable part of a property.
///
/// Mutator closures passed to the entity store receive this struct, so they
/// cannot touch identity, lifecycle or ordering fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFields {
    pub name: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(flatten)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub private: bool,
}

impl PropertyFields {
    /// Fields for a property with the given name and type
    pub fn new(name: LocalizedText, property_type: PropertyType) -> Self {
        Self {
            name,
            property_type,
            ..Default::default()
        }
    }

    /// Shorthand for a single-locale name
    pub fn named(locale: &str, name: &str, property_type: PropertyType) -> Self {
        Self::new(LocalizedText::new().with(locale, name), property_type)
    }
}

/// A named, typed field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(flatten)]
    pub fields: PropertyFields,
    /// True until a refresh confirms the server persisted this property
    #[serde(default)]
    pub is_new: bool,
    pub display_order: u32,
}

impl Property {
    pub fn new(id: PropertyId, fields: PropertyFields, display_order: u32) -> Self {
        Self {
            id,
            fields,
            is_new: false,
            display_order,
        }
    }
}

/// A value belonging to an option-typed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub id: OptionId,
    pub property_id: PropertyId,
    pub name: LocalizedText,
    pub display_order: u32,
    #[serde(default)]
    pub is_new: bool,
}

impl PropertyOption {
    pub fn new(id: OptionId, property_id: PropertyId, name: LocalizedText, display_order: u32) -> Self {
        Self {
            id,
            property_id,
            name,
            display_order,
            is_new: false,
        }
    }
}

/// A property as held by the server, with its options embedded.
///
/// Baselines and fetched snapshots are lists of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default)]
    pub options: Vec<PropertyOption>,
}

impl PropertyRecord {
    pub fn new(property: Property, options: Vec<PropertyOption>) -> Self {
        Self { property, options }
    }

    pub fn id(&self) -> &PropertyId {
        &self.property.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OptionMetadata, TextMetadata};

    #[test]
    fn test_record_wire_format_is_flat() {
        let property = Property::new(
            PropertyId::new("color"),
            PropertyFields::named("en", "Color", PropertyType::Option(OptionMetadata::default())),
            0,
        );
        let option = PropertyOption::new(
            OptionId::new("red"),
            PropertyId::new("color"),
            LocalizedText::new().with("en", "Red"),
            0,
        );
        let record = PropertyRecord::new(property, vec![option]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "color");
        assert_eq!(json["name"]["en"], "Color");
        assert_eq!(json["type"], "option");
        assert_eq!(json["display_order"], 0);
        assert_eq!(json["options"][0]["property_id"], "color");

        let back: PropertyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_server_payload_without_flags_defaults() {
        let json = r#"{
            "id": "title",
            "name": {"en": "Title"},
            "type": "text",
            "metadata": {"max_length": 80},
            "display_order": 3
        }"#;
        let record: PropertyRecord = serde_json::from_str(json).unwrap();
        assert!(!record.property.is_new);
        assert!(!record.property.fields.required);
        assert!(record.options.is_empty());
        assert_eq!(
            record.property.fields.property_type,
            PropertyType::Text(TextMetadata { max_length: Some(80), multiline: false })
        );
    }
}
