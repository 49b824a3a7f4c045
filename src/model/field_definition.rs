use crate::error::{Result, WitError};
use crate::model::field_type::FieldType;
use crate::model::kind::Kind;
use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A named slot on a work item type: its type, whether it must be set, and
/// display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "crate::model::is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    #[must_use]
    pub const fn new(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            label: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// # Errors
    ///
    /// Returns the field type's validation error.
    pub fn validate(&self) -> Result<()> {
        self.field_type.validate()
    }

    /// Convert an incoming value for field `name` into stored form.
    ///
    /// Null is replaced by the type's default first. A required field that
    /// is still null, or a required string that is blank, is rejected.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField`, or the type's conversion error wrapped with
    /// the field name.
    pub fn convert_to_model(&self, name: &str, value: &FieldValue) -> Result<Value> {
        if self.required && self.field_type.kind() == Kind::String {
            if let FieldValue::String(s) = value {
                if s.trim().is_empty() {
                    return Err(required(name, "empty"));
                }
            }
        }
        let stored = self.field_type.convert_to_model(value).map_err(|e| {
            debug!(field = name, error = %e, "Rejected field value");
            e.in_field(name)
        })?;
        if self.required && stored.is_null() {
            return Err(required(name, "nil"));
        }
        Ok(stored)
    }

    /// Convert a stored value for field `name` back to external form.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for a null required field, or the type's
    /// conversion error wrapped with the field name.
    pub fn convert_from_model(&self, name: &str, value: &Value) -> Result<FieldValue> {
        if self.required && value.is_null() {
            return Err(required(name, "nil"));
        }
        self.field_type
            .convert_from_model(value)
            .map_err(|e| e.in_field(name))
    }

    /// Schema compatibility: same requiredness and a type that can replace
    /// the old one.
    #[must_use]
    pub fn equal_value(&self, old: &Self) -> bool {
        self.required == old.required && self.field_type.equal_value(&old.field_type)
    }
}

fn required(field: &str, problem: &str) -> WitError {
    WitError::RequiredField {
        field: field.to_string(),
        problem: problem.to_string(),
    }
}
