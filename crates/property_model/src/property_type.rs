//! Property type tags and their type-specific metadata

use serde::{Deserialize, Serialize};

/// The closed set of property types.
///
/// Serialized adjacently as `{"type": "number", "metadata": {...}}` so the tag
/// stays readable on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "lowercase")]
pub enum PropertyType {
    Text(TextMetadata),
    Number(NumberMetadata),
    Boolean(BooleanMetadata),
    Option(OptionMetadata),
    Size(SizeMetadata),
}

impl PropertyType {
    /// Get the type tag
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyType::Text(_) => PropertyKind::Text,
            PropertyType::Number(_) => PropertyKind::Number,
            PropertyType::Boolean(_) => PropertyKind::Boolean,
            PropertyType::Option(_) => PropertyKind::Option,
            PropertyType::Size(_) => PropertyKind::Size,
        }
    }

    /// Whether properties of this type own a list of options
    pub fn accepts_options(&self) -> bool {
        matches!(self, PropertyType::Option(_))
    }

    /// A type with default metadata for the given tag
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Text => PropertyType::Text(TextMetadata::default()),
            PropertyKind::Number => PropertyType::Number(NumberMetadata::default()),
            PropertyKind::Boolean => PropertyType::Boolean(BooleanMetadata::default()),
            PropertyKind::Option => PropertyType::Option(OptionMetadata::default()),
            PropertyKind::Size => PropertyType::Size(SizeMetadata::default()),
        }
    }
}

impl Default for PropertyType {
    fn default() -> Self {
        PropertyType::Text(TextMetadata::default())
    }
}

/// Bare type tag without metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Text,
    Number,
    Boolean,
    Option,
    Size,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMetadata {
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub multiline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberMetadata {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanMetadata {
    #[serde(default)]
    pub default_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    #[serde(default)]
    pub multi_select: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMetadata {
    pub unit: SizeUnit,
    /// Number of measured dimensions (1 = length, 2 = area, 3 = volume)
    pub dimensions: u8,
}

impl Default for SizeMetadata {
    fn default() -> Self {
        Self {
            unit: SizeUnit::Cm,
            dimensions: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    Mm,
    Cm,
    M,
    In,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_tagged() {
        let ty = PropertyType::Number(NumberMetadata {
            min: Some(0.0),
            max: None,
            decimals: 2,
            unit: Some("kg".to_string()),
        });
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["type"], "number");
        assert_eq!(json["metadata"]["decimals"], 2);
        assert_eq!(json["metadata"]["unit"], "kg");
    }

    #[test]
    fn test_metadata_fields_default_when_missing() {
        let ty: PropertyType =
            serde_json::from_str(r#"{"type":"option","metadata":{}}"#).unwrap();
        assert_eq!(ty, PropertyType::Option(OptionMetadata { multi_select: false }));
        assert!(ty.accepts_options());
    }

    #[test]
    fn test_default_for_matches_kind() {
        for kind in [
            PropertyKind::Text,
            PropertyKind::Number,
            PropertyKind::Boolean,
            PropertyKind::Option,
            PropertyKind::Size,
        ] {
            assert_eq!(PropertyType::default_for(kind).kind(), kind);
        }
    }
}
