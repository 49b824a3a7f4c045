use std::collections::BTreeMap;
use wit_core::model::{FieldDefinition, FieldType, FieldValue, Kind, WorkItemType};

/// A small type: required title, optional integer points, optional labels.
pub fn story() -> WorkItemType {
    WorkItemType::new("story")
        .with_field(
            "system_title",
            FieldDefinition::new(FieldType::simple(Kind::String), true),
        )
        .with_field(
            "points",
            FieldDefinition::new(FieldType::simple(Kind::Integer), false),
        )
        .with_field(
            "system_labels",
            FieldDefinition::new(FieldType::list(Kind::Label), false),
        )
}

/// A type sharing `system_title` with [`story`] but storing `points` as a
/// float and labels as a single label.
pub fn bug() -> WorkItemType {
    WorkItemType::new("bug")
        .with_field(
            "system_title",
            FieldDefinition::new(FieldType::simple(Kind::String), true),
        )
        .with_field(
            "points",
            FieldDefinition::new(FieldType::simple(Kind::Float), false),
        )
        .with_field(
            "system_labels",
            FieldDefinition::new(FieldType::simple(Kind::Label), false),
        )
        .with_field(
            "severity",
            FieldDefinition::new(
                FieldType::enumeration(Kind::String, ["low", "high"]).unwrap(),
                true,
            ),
        )
}

pub fn fields(pairs: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}
