//! The closed family of field types.
//!
//! A [`FieldType`] is either a [`SimpleType`], an [`EnumType`] over a simple
//! base, or a [`ListType`] of simple components. Every variant converts
//! between the external [`FieldValue`] form and the stored JSON form.
//!
//! On disk a field type is a flat JSON object:
//!
//! ```json
//! {"kind": "enum", "base_type": {"kind": "string"}, "values": ["new", "done"]}
//! ```

use crate::error::{Result, WitError};
use crate::model::enum_type::EnumType;
use crate::model::kind::Kind;
use crate::model::list_type::ListType;
use crate::model::simple_type::SimpleType;
use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// A field's type. Structural equality is `PartialEq`; schema compatibility
/// is [`FieldType::equal_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldType", into = "RawFieldType")]
pub enum FieldType {
    Simple(SimpleType),
    Enum(EnumType),
    List(ListType),
}

impl FieldType {
    #[must_use]
    pub const fn simple(kind: Kind) -> Self {
        Self::Simple(SimpleType::new(kind))
    }

    #[must_use]
    pub const fn list(component_kind: Kind) -> Self {
        Self::List(ListType::new(component_kind))
    }

    /// # Errors
    ///
    /// See [`EnumType::new`].
    pub fn enumeration<I, V>(base_kind: Kind, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        EnumType::new(base_kind, values).map(Self::Enum)
    }

    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Simple(t) => t.kind,
            Self::Enum(_) => Kind::Enum,
            Self::List(_) => Kind::List,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidFieldType` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Simple(t) => t.validate(),
            Self::Enum(t) => t.validate(),
            Self::List(t) => t.validate(),
        }
    }

    /// # Errors
    ///
    /// Returns the variant's conversion error.
    pub fn convert_to_model(&self, value: &FieldValue) -> Result<Value> {
        match self {
            Self::Simple(t) => t.convert_to_model(value),
            Self::Enum(t) => t.convert_to_model(value),
            Self::List(t) => t.convert_to_model(value),
        }
    }

    /// # Errors
    ///
    /// Returns the variant's conversion error.
    pub fn convert_from_model(&self, value: &Value) -> Result<FieldValue> {
        match self {
            Self::Simple(t) => t.convert_from_model(value),
            Self::Enum(t) => t.convert_from_model(value),
            Self::List(t) => t.convert_from_model(value),
        }
    }

    /// Effective default in stored form.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Self::Simple(t) => t.default_value(),
            Self::Enum(t) => t.default_value(),
            Self::List(t) => t.default_value(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the value does not fit this type.
    pub fn set_default_value(&mut self, value: &FieldValue) -> Result<()> {
        match self {
            Self::Simple(t) => t.set_default_value(value),
            Self::Enum(t) => t.set_default_value(value),
            Self::List(t) => t.set_default_value(value),
        }
    }

    /// Can `self` replace `old` on an existing type? Defaults are ignored;
    /// enums must enclose the old value set unless rewritable.
    #[must_use]
    pub fn equal_value(&self, old: &Self) -> bool {
        match (self, old) {
            (Self::Simple(a), Self::Simple(b)) => a.kind == b.kind,
            (Self::Enum(a), Self::Enum(b)) => a.equal_value(b),
            (Self::List(a), Self::List(b)) => a.component_type.kind == b.component_type.kind,
            _ => false,
        }
    }

    /// Move a value stored under `self` to its stored form under `target`.
    ///
    /// Direct conversion is tried first. A scalar moving to a list is wrapped
    /// as a one-element list; a one-element list moving to a scalar type is
    /// unwrapped.
    ///
    /// # Errors
    ///
    /// Returns `TypeConversion` when no strategy produces a valid value.
    pub fn convert_to_model_with_type(&self, target: &Self, stored: &Value) -> Result<Value> {
        let external = self.convert_from_model(stored)?;
        let direct = match target.convert_to_model(&external) {
            Ok(converted) => return Ok(converted),
            Err(e) => e,
        };

        let retry = match (target, &external) {
            (Self::List(_), FieldValue::List(_)) => None,
            (Self::List(_), scalar) => Some(FieldValue::List(vec![scalar.clone()])),
            (Self::Simple(_) | Self::Enum(_), FieldValue::List(items)) if items.len() == 1 => {
                Some(items[0].clone())
            }
            _ => None,
        };
        if let Some(candidate) = retry {
            match target.convert_to_model(&candidate) {
                Ok(converted) => return Ok(converted),
                Err(e) => trace!(error = %e, "Reshaped conversion failed"),
            }
        }

        Err(WitError::TypeConversion {
            from: self.kind(),
            to: target.kind(),
            reason: direct.to_string(),
        })
    }
}

/// Flat persisted shape of a [`FieldType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldType {
    kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_type: Option<SimpleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component_type: Option<SimpleType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
    #[serde(default, skip_serializing_if = "crate::model::is_false")]
    rewritable_values: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
}

impl TryFrom<RawFieldType> for FieldType {
    type Error = WitError;

    fn try_from(raw: RawFieldType) -> Result<Self> {
        match raw.kind {
            Kind::Enum => {
                let base_type = raw
                    .base_type
                    .map(normalize_default)
                    .ok_or_else(|| WitError::invalid_type("enum type requires base_type"))?;
                let values = raw
                    .values
                    .into_iter()
                    .map(|value| normalized(&base_type, value))
                    .collect();
                let default_value = raw.default_value.map(|value| normalized(&base_type, value));
                Ok(Self::Enum(EnumType {
                    base_type,
                    values,
                    rewritable_values: raw.rewritable_values,
                    default_value,
                }))
            }
            Kind::List => {
                let component_type = raw
                    .component_type
                    .map(normalize_default)
                    .ok_or_else(|| WitError::invalid_type("list type requires component_type"))?;
                let default_value = raw.default_value.map(|value| match value {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| normalized(&component_type, item))
                            .collect(),
                    ),
                    other => other,
                });
                Ok(Self::List(ListType {
                    component_type,
                    default_value,
                }))
            }
            kind => {
                if !raw.values.is_empty() {
                    return Err(WitError::invalid_type(format!(
                        "values are only allowed on enum types, not {kind}"
                    )));
                }
                Ok(Self::Simple(normalize_default(SimpleType {
                    kind,
                    default_value: raw.default_value,
                })))
            }
        }
    }
}

/// Declared values may be written in external form. Values that do not
/// convert are kept as written so that `validate` reports them.
fn normalized(simple: &SimpleType, value: Value) -> Value {
    simple.normalize(&value).unwrap_or(value)
}

fn normalize_default(mut simple: SimpleType) -> SimpleType {
    if let Some(value) = simple.default_value.take() {
        simple.default_value = Some(normalized(&simple, value));
    }
    simple
}

impl From<FieldType> for RawFieldType {
    fn from(field_type: FieldType) -> Self {
        let kind = field_type.kind();
        match field_type {
            FieldType::Simple(t) => Self {
                kind,
                base_type: None,
                component_type: None,
                values: Vec::new(),
                rewritable_values: false,
                default_value: t.default_value,
            },
            FieldType::Enum(t) => Self {
                kind,
                base_type: Some(t.base_type),
                component_type: None,
                values: t.values,
                rewritable_values: t.rewritable_values,
                default_value: t.default_value,
            },
            FieldType::List(t) => Self {
                kind,
                base_type: None,
                component_type: Some(t.component_type),
                values: Vec::new(),
                rewritable_values: false,
                default_value: t.default_value,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_json_shape() {
        let t = FieldType::enumeration(Kind::String, ["new", "done"]).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        insta::assert_json_snapshot!(json, @r###"
        {
          "base_type": {
            "kind": "string"
          },
          "kind": "enum",
          "values": [
            "new",
            "done"
          ]
        }
        "###);
        let back: FieldType = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn list_requires_component_type() {
        let err = serde_json::from_value::<FieldType>(json!({"kind": "list"})).unwrap_err();
        assert!(err.to_string().contains("component_type"));
    }

    #[test]
    fn values_on_simple_type_are_rejected() {
        let parsed = serde_json::from_value::<FieldType>(json!({"kind": "string", "values": ["a"]}));
        assert!(parsed.is_err());
    }

    #[test]
    fn equal_value_ignores_defaults() {
        let mut a = FieldType::simple(Kind::String);
        a.set_default_value(&"x".into()).unwrap();
        let b = FieldType::simple(Kind::String);
        assert!(a.equal_value(&b));
        assert_ne!(a, b);
        assert!(!FieldType::simple(Kind::User).equal_value(&b));
        assert!(!FieldType::list(Kind::String).equal_value(&b));
    }

    #[test]
    fn scalar_is_wrapped_when_moving_to_list() {
        let from = FieldType::simple(Kind::Label);
        let to = FieldType::list(Kind::Label);
        let moved = from.convert_to_model_with_type(&to, &json!("bug")).unwrap();
        assert_eq!(moved, json!(["bug"]));
    }

    #[test]
    fn single_element_list_is_unwrapped() {
        let from = FieldType::list(Kind::User);
        let to = FieldType::simple(Kind::User);
        assert_eq!(
            from.convert_to_model_with_type(&to, &json!(["alice"])).unwrap(),
            json!("alice")
        );
        let err = from
            .convert_to_model_with_type(&to, &json!(["alice", "bob"]))
            .unwrap_err();
        assert!(matches!(
            err,
            WitError::TypeConversion {
                from: Kind::List,
                to: Kind::User,
                ..
            }
        ));
    }

    #[test]
    fn compatible_kinds_convert_directly() {
        let from = FieldType::simple(Kind::Integer);
        let to = FieldType::simple(Kind::Float);
        assert_eq!(from.convert_to_model_with_type(&to, &json!(3)).unwrap(), json!(3.0));
        let to_enum = FieldType::enumeration(Kind::String, ["a", "b"]).unwrap();
        let from_string = FieldType::simple(Kind::String);
        assert!(from_string.convert_to_model_with_type(&to_enum, &json!("c")).is_err());
    }
}
