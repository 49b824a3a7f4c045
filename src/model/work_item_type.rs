//! Work item type schemas.
//!
//! A [`WorkItemType`] maps logical field names to [`FieldDefinition`]s.
//! Types may extend a base type, inheriting its fields, and may evolve over
//! time as long as every existing field keeps an assignment-compatible
//! definition.

use crate::error::{Result, ValidationError, WitError};
use crate::model::enum_type::EnumType;
use crate::model::field_definition::FieldDefinition;
use crate::model::field_type::FieldType;
use crate::model::kind::Kind;
use crate::model::simple_type::SimpleType;
use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const SYSTEM_TITLE: &str = "system_title";
pub const SYSTEM_DESCRIPTION: &str = "system_description";
pub const SYSTEM_STATE: &str = "system_state";
pub const SYSTEM_METASTATE: &str = "system_metastate";
pub const SYSTEM_ASSIGNEES: &str = "system_assignees";
pub const SYSTEM_CREATOR: &str = "system_creator";
pub const SYSTEM_CREATED_AT: &str = "system_created_at";
pub const SYSTEM_UPDATED_AT: &str = "system_updated_at";
pub const SYSTEM_ORDER: &str = "system_order";
pub const SYSTEM_ITERATION: &str = "system_iteration";
pub const SYSTEM_AREA: &str = "system_area";
pub const SYSTEM_CODEBASE: &str = "system_codebase";
pub const SYSTEM_LABELS: &str = "system_labels";
pub const SYSTEM_BOARDCOLUMNS: &str = "system_boardcolumns";
pub const SYSTEM_NUMBER: &str = "system_number";
pub const SYSTEM_REMOTE_ITEM_ID: &str = "system_remote_item_id";

pub const STATE_VALUES: [&str; 5] = ["new", "open", "in progress", "resolved", "closed"];
pub const METASTATE_VALUES: [&str; 5] = ["mNew", "mOpen", "mInprogress", "mResolved", "mClosed"];

const fn default_true() -> bool {
    true
}

const fn default_version() -> i64 {
    1
}

fn string_enum(values: &[&str]) -> FieldType {
    FieldType::Enum(EnumType {
        base_type: SimpleType::new(Kind::String),
        values: values.iter().map(|v| Value::from(*v)).collect(),
        rewritable_values: false,
        default_value: None,
    })
}

/// Schema of one kind of work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemType {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_type_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub can_construct: bool,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl WorkItemType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            icon: None,
            extended_type_id: None,
            can_construct: true,
            version: default_version(),
            fields: BTreeMap::new(),
        }
    }

    /// A type carrying the standard system fields.
    #[must_use]
    pub fn with_system_fields(name: impl Into<String>) -> Self {
        let state = string_enum(&STATE_VALUES);
        let metastate = string_enum(&METASTATE_VALUES);

        Self::new(name)
            .with_field(
                SYSTEM_TITLE,
                FieldDefinition::new(FieldType::simple(Kind::String), true).with_label("Title"),
            )
            .with_field(
                SYSTEM_DESCRIPTION,
                FieldDefinition::new(FieldType::simple(Kind::Markup), false)
                    .with_label("Description"),
            )
            .with_field(
                SYSTEM_STATE,
                FieldDefinition::new(state, true).with_label("State"),
            )
            .with_field(
                SYSTEM_METASTATE,
                FieldDefinition::new(metastate, false).with_label("Meta State"),
            )
            .with_field(
                SYSTEM_ASSIGNEES,
                FieldDefinition::new(FieldType::list(Kind::User), false).with_label("Assignees"),
            )
            .with_field(
                SYSTEM_CREATOR,
                FieldDefinition::new(FieldType::simple(Kind::User), false).with_label("Creator"),
            )
            .with_field(
                SYSTEM_CREATED_AT,
                FieldDefinition::new(FieldType::simple(Kind::Instant), false)
                    .with_label("Created at"),
            )
            .with_field(
                SYSTEM_UPDATED_AT,
                FieldDefinition::new(FieldType::simple(Kind::Instant), false)
                    .with_label("Updated at"),
            )
            .with_field(
                SYSTEM_ORDER,
                FieldDefinition::new(FieldType::simple(Kind::Float), false).with_label("Order"),
            )
            .with_field(
                SYSTEM_ITERATION,
                FieldDefinition::new(FieldType::simple(Kind::Iteration), false)
                    .with_label("Iteration"),
            )
            .with_field(
                SYSTEM_AREA,
                FieldDefinition::new(FieldType::simple(Kind::Area), false).with_label("Area"),
            )
            .with_field(
                SYSTEM_CODEBASE,
                FieldDefinition::new(FieldType::simple(Kind::Codebase), false)
                    .with_label("Codebase"),
            )
            .with_field(
                SYSTEM_LABELS,
                FieldDefinition::new(FieldType::list(Kind::Label), false).with_label("Labels"),
            )
            .with_field(
                SYSTEM_BOARDCOLUMNS,
                FieldDefinition::new(FieldType::list(Kind::BoardColumn), false)
                    .with_label("Board columns"),
            )
            .with_field(
                SYSTEM_NUMBER,
                FieldDefinition::new(FieldType::simple(Kind::Integer), false)
                    .with_label("Number"),
            )
            .with_field(
                SYSTEM_REMOTE_ITEM_ID,
                FieldDefinition::new(FieldType::simple(Kind::String), false)
                    .with_label("Remote item"),
            )
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Validate the name and every field definition, reporting all problems.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a single problem or `ValidationErrors` for
    /// several.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "cannot be empty"));
        }
        for (name, definition) in &self.fields {
            if name.trim().is_empty() {
                errors.push(ValidationError::new("fields", "field name cannot be empty"));
                continue;
            }
            if name.contains(['\'', '"']) {
                errors.push(ValidationError::new(
                    name.as_str(),
                    "field name must not contain quotes",
                ));
            }
            if name.chars().any(char::is_whitespace) {
                errors.push(ValidationError::new(
                    name.as_str(),
                    "field name must not contain whitespace",
                ));
            }
            if let Err(e) = definition.validate() {
                errors.push(ValidationError::new(name.as_str(), e.to_string()));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WitError::from_validation_errors(errors))
        }
    }

    /// Merge `base`'s fields into this type.
    ///
    /// Fields only the base declares are inherited. A field declared by both
    /// must be assignment-compatible with the base definition; the child's
    /// definition (label, default, extra enum values) is kept.
    ///
    /// # Errors
    ///
    /// Returns `Incompatible` for the first conflicting field.
    pub fn extend(mut self, base: &Self) -> Result<Self> {
        for (name, base_definition) in &base.fields {
            match self.fields.get(name) {
                Some(own) if own.equal_value(base_definition) => {}
                Some(_) => {
                    return Err(WitError::Incompatible {
                        field: name.clone(),
                        reason: format!("does not enclose the definition inherited from {}", base.name),
                    });
                }
                None => {
                    self.fields.insert(name.clone(), base_definition.clone());
                }
            }
        }
        self.extended_type_id = Some(base.id);
        Ok(self)
    }

    /// Check that `self` may replace `old` without invalidating stored items.
    ///
    /// # Errors
    ///
    /// Returns `Incompatible` for the first removed or narrowed field.
    pub fn check_evolution(&self, old: &Self) -> Result<()> {
        for (name, old_definition) in &old.fields {
            match self.fields.get(name) {
                None => {
                    return Err(WitError::Incompatible {
                        field: name.clone(),
                        reason: "field cannot be removed".to_string(),
                    });
                }
                Some(new_definition) if !new_definition.equal_value(old_definition) => {
                    return Err(WitError::Incompatible {
                        field: name.clone(),
                        reason: "new definition does not enclose the old one".to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Convert an external field map into the stored document. Every
    /// declared field is written; absent fields go through their default.
    /// Undeclared keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first field's conversion error.
    pub fn convert_to_model(
        &self,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<Map<String, Value>> {
        let mut document = Map::new();
        for (name, definition) in &self.fields {
            let value = fields.get(name).unwrap_or(&FieldValue::Null);
            let stored = definition.convert_to_model(name, value)?;
            if !stored.is_null() {
                document.insert(name.clone(), stored);
            }
        }
        Ok(document)
    }

    /// Convert a stored document back to external values.
    ///
    /// # Errors
    ///
    /// Returns the first field's conversion error.
    pub fn convert_from_model(
        &self,
        document: &Map<String, Value>,
    ) -> Result<BTreeMap<String, FieldValue>> {
        let mut fields = BTreeMap::new();
        for (name, definition) in &self.fields {
            let stored = document.get(name).unwrap_or(&Value::Null);
            fields.insert(name.clone(), definition.convert_from_model(name, stored)?);
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> WorkItemType {
        WorkItemType::new("task")
            .with_field(
                SYSTEM_TITLE,
                FieldDefinition::new(FieldType::simple(Kind::String), true),
            )
            .with_field(
                "priority",
                FieldDefinition::new(
                    FieldType::enumeration(Kind::String, ["low", "high"]).unwrap(),
                    false,
                ),
            )
    }

    #[test]
    fn system_template_validates() {
        let wit = WorkItemType::with_system_fields("bug");
        wit.validate().unwrap();
        assert_eq!(wit.fields.len(), 16);
        assert_eq!(
            wit.field(SYSTEM_STATE).unwrap().field_type.default_value(),
            Some(&json!("new"))
        );
    }

    #[test]
    fn validate_reports_every_bad_field() {
        let wit = WorkItemType::new("")
            .with_field("a'b", FieldDefinition::new(FieldType::simple(Kind::String), false))
            .with_field("nested", FieldDefinition::new(FieldType::list(Kind::List), false));
        let err = wit.validate().unwrap_err();
        let WitError::ValidationErrors { errors } = err else {
            panic!("expected several errors, got {err:?}");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn extend_inherits_and_checks_overlap() {
        let base = task();
        let child = WorkItemType::new("subtask")
            .with_field("estimate", FieldDefinition::new(FieldType::simple(Kind::Float), false))
            .extend(&base)
            .unwrap();
        assert_eq!(child.extended_type_id, Some(base.id));
        assert!(child.field(SYSTEM_TITLE).is_some());
        assert!(child.field("estimate").is_some());

        let clash = WorkItemType::new("clash")
            .with_field(SYSTEM_TITLE, FieldDefinition::new(FieldType::simple(Kind::Integer), true))
            .extend(&base)
            .unwrap_err();
        assert!(matches!(clash, WitError::Incompatible { field, .. } if field == SYSTEM_TITLE));
    }

    #[test]
    fn child_may_widen_inherited_enum() {
        let child = WorkItemType::new("urgent")
            .with_field(
                "priority",
                FieldDefinition::new(
                    FieldType::enumeration(Kind::String, ["low", "high", "urgent"]).unwrap(),
                    false,
                ),
            )
            .extend(&task())
            .unwrap();
        let FieldType::Enum(priority) = &child.field("priority").unwrap().field_type else {
            panic!("priority should stay an enum");
        };
        assert_eq!(priority.values.len(), 3);
    }

    #[test]
    fn evolution_rejects_removed_and_narrowed_fields() {
        let old = task();
        let mut removed = old.clone();
        removed.fields.remove("priority");
        assert!(removed.check_evolution(&old).is_err());

        let narrowed = old.clone().with_field(
            "priority",
            FieldDefinition::new(FieldType::enumeration(Kind::String, ["low"]).unwrap(), false),
        );
        assert!(narrowed.check_evolution(&old).is_err());

        let added = old
            .clone()
            .with_field("points", FieldDefinition::new(FieldType::simple(Kind::Integer), false));
        added.check_evolution(&old).unwrap();
    }

    #[test]
    fn row_conversion_applies_defaults_and_drops_unknown_keys() {
        let wit = task();
        let mut fields = BTreeMap::new();
        fields.insert(SYSTEM_TITLE.to_string(), FieldValue::from("Fix it"));
        fields.insert("unknown".to_string(), FieldValue::from(1_i64));
        let document = wit.convert_to_model(&fields).unwrap();
        assert_eq!(
            Value::Object(document.clone()),
            json!({"system_title": "Fix it", "priority": "low"})
        );
        let back = wit.convert_from_model(&document).unwrap();
        assert_eq!(back["priority"], FieldValue::from("low"));
        assert!(!back.contains_key("unknown"));
    }

    #[test]
    fn missing_required_field_fails_the_row() {
        let err = task().convert_to_model(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, WitError::RequiredField { .. }));
    }
}
