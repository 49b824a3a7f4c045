use crate::error::{Result, WitError};
use crate::model::kind::Kind;
use crate::model::simple_type::SimpleType;
use crate::model::value::FieldValue;
use serde_json::Value;

/// A closed set of allowed values over a simple base type.
///
/// `values` and `default_value` are held in stored form. When no explicit
/// default is set the first allowed value acts as the default.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub base_type: SimpleType,
    pub values: Vec<Value>,
    /// Values may be replaced wholesale when the type evolves.
    pub rewritable_values: bool,
    pub default_value: Option<Value>,
}

impl EnumType {
    /// Build an enum over `base_kind`, converting each value to stored form.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit the base kind or the
    /// resulting enum does not validate.
    pub fn new<I, V>(base_kind: Kind, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let base_type = SimpleType::new(base_kind);
        let values = values
            .into_iter()
            .map(|v| base_type.convert_value(&v.into()))
            .collect::<Result<Vec<_>>>()?;
        let enum_type = Self {
            base_type,
            values,
            rewritable_values: false,
            default_value: None,
        };
        enum_type.validate()?;
        Ok(enum_type)
    }

    #[must_use]
    pub const fn rewritable(mut self, rewritable: bool) -> Self {
        self.rewritable_values = rewritable;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidFieldType` if the base is not simple, the value set is
    /// empty or repeats itself, or the default is not an allowed value.
    pub fn validate(&self) -> Result<()> {
        self.base_type.validate()?;
        if self.values.is_empty() {
            return Err(WitError::invalid_type("enum type must have at least one value"));
        }
        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                return Err(WitError::invalid_type("enum values must not be null"));
            }
            self.base_type
                .check_stored(value)
                .map_err(|e| WitError::invalid_type(format!("enum value {e}")))?;
            if self.values[..i].contains(value) {
                return Err(WitError::invalid_type(format!(
                    "duplicate enum value {value}"
                )));
            }
        }
        if let Some(default) = &self.default_value {
            if !self.contains(default) {
                return Err(WitError::invalid_type(format!(
                    "default value {default} is not one of the enum values"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref().or_else(|| self.values.first())
    }

    /// Replace the explicit default. `Null` falls back to the first value.
    ///
    /// # Errors
    ///
    /// Returns `NotInEnum` if the value is not allowed.
    pub fn set_default_value(&mut self, value: &FieldValue) -> Result<()> {
        if value.is_null() {
            self.default_value = None;
            return Ok(());
        }
        let stored = self.base_type.convert_value(value)?;
        if !self.contains(&stored) {
            return Err(self.not_allowed(value));
        }
        self.default_value = Some(stored);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the base type's conversion error, or `NotInEnum`.
    pub fn convert_to_model(&self, value: &FieldValue) -> Result<Value> {
        if value.is_null() {
            return Ok(self.default_value().cloned().unwrap_or(Value::Null));
        }
        let stored = self.base_type.convert_value(value)?;
        if !self.contains(&stored) {
            return Err(self.not_allowed(value));
        }
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns the base type's conversion error.
    pub fn convert_from_model(&self, value: &Value) -> Result<FieldValue> {
        self.base_type.convert_from_model(value)
    }

    /// True if `self` can replace `old` without invalidating stored data:
    /// same base and flag, and every old value is still allowed.
    #[must_use]
    pub fn equal_enclosing(&self, old: &Self) -> bool {
        self.base_type == old.base_type
            && self.rewritable_values == old.rewritable_values
            && old.values.iter().all(|v| self.contains(v))
    }

    /// Schema-compatibility check. Rewritable enums may change their values
    /// freely; the others must enclose the old value set.
    #[must_use]
    pub fn equal_value(&self, old: &Self) -> bool {
        if self.rewritable_values && old.rewritable_values {
            return self.base_type == old.base_type;
        }
        self.equal_enclosing(old)
    }

    fn not_allowed(&self, value: &FieldValue) -> WitError {
        let allowed = self
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        WitError::NotInEnum {
            value: value.to_string(),
            allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn states() -> EnumType {
        EnumType::new(Kind::String, ["new", "open", "closed"]).unwrap()
    }

    #[test]
    fn membership_is_enforced() {
        let t = states();
        assert_eq!(t.convert_to_model(&"open".into()).unwrap(), json!("open"));
        let err = t.convert_to_model(&"gone".into()).unwrap_err();
        assert!(matches!(err, WitError::NotInEnum { .. }));
        assert!(err.to_string().contains("\"gone\""));
    }

    #[test]
    fn base_kind_is_checked_before_membership() {
        let err = states().convert_to_model(&FieldValue::Integer(1)).unwrap_err();
        assert!(matches!(err, WitError::TypeMismatch { .. }));
    }

    #[test]
    fn first_value_is_implicit_default() {
        let mut t = states();
        assert_eq!(t.convert_to_model(&FieldValue::Null).unwrap(), json!("new"));
        t.set_default_value(&"closed".into()).unwrap();
        assert_eq!(t.convert_to_model(&FieldValue::Null).unwrap(), json!("closed"));
        assert!(t.set_default_value(&"other".into()).is_err());
    }

    #[test]
    fn validate_rejects_empty_duplicate_and_structural() {
        assert!(EnumType::new(Kind::String, Vec::<&str>::new()).is_err());
        assert!(EnumType::new(Kind::String, ["a", "a"]).is_err());
        assert!(EnumType::new(Kind::List, ["a"]).is_err());
        assert!(EnumType::new(Kind::Integer, ["a"]).is_err());
    }

    #[test]
    fn integer_enums_convert_their_values() {
        let t = EnumType::new(Kind::Integer, [1_i64, 2, 3]).unwrap();
        assert_eq!(t.convert_to_model(&"2".into()).unwrap(), json!(2));
        assert!(t.convert_to_model(&FieldValue::Integer(4)).is_err());
    }

    #[test]
    fn superset_encloses_but_subset_does_not() {
        let old = states();
        let grown = EnumType::new(Kind::String, ["new", "open", "closed", "resolved"]).unwrap();
        let shrunk = EnumType::new(Kind::String, ["new", "open"]).unwrap();
        assert!(grown.equal_enclosing(&old));
        assert!(grown.equal_value(&old));
        assert!(!shrunk.equal_enclosing(&old));
        assert!(!shrunk.equal_value(&old));
    }

    #[test]
    fn rewritable_enums_may_drop_values() {
        let old = states().rewritable(true);
        let shrunk = EnumType::new(Kind::String, ["todo"]).unwrap().rewritable(true);
        assert!(!shrunk.equal_enclosing(&old));
        assert!(shrunk.equal_value(&old));
        let other_base = EnumType::new(Kind::Label, ["todo"]).unwrap().rewritable(true);
        assert!(!other_base.equal_value(&old));
    }

    #[test]
    fn flag_mismatch_is_incompatible() {
        let old = states();
        assert!(!states().rewritable(true).equal_value(&old));
    }
}
