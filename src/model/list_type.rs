use crate::error::{Result, WitError};
use crate::model::kind::Kind;
use crate::model::simple_type::SimpleType;
use crate::model::value::FieldValue;
use serde_json::Value;

/// An ordered list whose elements all share one simple component type.
#[derive(Debug, Clone, PartialEq)]
pub struct ListType {
    pub component_type: SimpleType,
    pub default_value: Option<Value>,
}

impl ListType {
    #[must_use]
    pub const fn new(component_kind: Kind) -> Self {
        Self {
            component_type: SimpleType::new(component_kind),
            default_value: None,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidFieldType` if the component kind is structural or the
    /// default is not a list of valid components.
    pub fn validate(&self) -> Result<()> {
        if !self.component_type.kind.is_simple() {
            return Err(WitError::invalid_type(format!(
                "list component type must be simple, got {}",
                self.component_type.kind
            )));
        }
        self.component_type.validate()?;
        match &self.default_value {
            None => {}
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    self.component_type.check_stored(item).map_err(|e| {
                        WitError::invalid_type(format!("default element {index}: {e}"))
                    })?;
                }
            }
            Some(other) => {
                return Err(WitError::invalid_type(format!(
                    "default value {other} is not a list"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// # Errors
    ///
    /// Returns an error if the value is not a list of valid components.
    pub fn set_default_value(&mut self, value: &FieldValue) -> Result<()> {
        self.default_value = if value.is_null() {
            None
        } else {
            Some(self.convert_items(value)?)
        };
        Ok(())
    }

    /// Convert element-wise. A single bad element fails the whole list.
    ///
    /// # Errors
    ///
    /// Returns `ListElement` naming the failing position, or `TypeMismatch`
    /// if the value is not a list.
    pub fn convert_to_model(&self, value: &FieldValue) -> Result<Value> {
        if value.is_null() {
            return Ok(self.default_value.clone().unwrap_or(Value::Null));
        }
        self.convert_items(value)
    }

    fn convert_items(&self, value: &FieldValue) -> Result<Value> {
        let FieldValue::List(items) = value else {
            return Err(WitError::mismatch(value, "list", value.shape()));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.component_type
                    .convert_to_model(item)
                    .map_err(|e| list_element(index, e))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// # Errors
    ///
    /// Returns `ListElement` naming the failing position, or `TypeMismatch`
    /// if the stored value is not an array.
    pub fn convert_from_model(&self, value: &Value) -> Result<FieldValue> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.component_type
                        .convert_from_model(item)
                        .map_err(|e| list_element(index, e))
                })
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::List),
            other => Err(WitError::mismatch(other, "list", "non-array")),
        }
    }
}

fn list_element(index: usize, source: WitError) -> WitError {
    WitError::ListElement {
        index,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_every_element() {
        let t = ListType::new(Kind::Integer);
        let value = FieldValue::from(vec![FieldValue::Integer(1), "2".into()]);
        assert_eq!(t.convert_to_model(&value).unwrap(), json!([1, 2]));
    }

    #[test]
    fn one_bad_element_fails_the_list() {
        let t = ListType::new(Kind::Integer);
        let value = FieldValue::from(vec![FieldValue::Integer(1), "x".into()]);
        let err = t.convert_to_model(&value).unwrap_err();
        assert!(matches!(err, WitError::ListElement { index: 1, .. }));
    }

    #[test]
    fn scalars_are_not_lists() {
        let t = ListType::new(Kind::Label);
        assert!(t.convert_to_model(&"bug".into()).is_err());
        assert!(t.convert_from_model(&json!("bug")).is_err());
    }

    #[test]
    fn structural_components_are_rejected() {
        assert!(ListType::new(Kind::List).validate().is_err());
        assert!(ListType::new(Kind::Enum).validate().is_err());
        assert!(ListType::new(Kind::User).validate().is_ok());
    }

    #[test]
    fn null_gives_default_list() {
        let mut t = ListType::new(Kind::Label);
        t.set_default_value(&vec!["triage"].into()).unwrap();
        assert_eq!(t.convert_to_model(&FieldValue::Null).unwrap(), json!(["triage"]));
    }
}
