use crate::error::{Result, WitError};
use crate::model::codebase::CodebaseContent;
use crate::model::kind::Kind;
use crate::model::markup::MarkupContent;
use crate::model::value::{FieldValue, integral, whole_number};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use url::Url;

/// A field type of one simple kind with an optional default value.
///
/// The default is held in model (stored) representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleType {
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl SimpleType {
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Self {
            kind,
            default_value: None,
        }
    }

    /// Set the default from an external value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not convert to this type.
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Result<Self> {
        self.set_default_value(&value.into())?;
        Ok(self)
    }

    /// Check the kind is simple and the default value fits it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFieldType` describing the problem.
    pub fn validate(&self) -> Result<()> {
        if !self.kind.is_simple() {
            return Err(WitError::invalid_type(format!(
                "simple type cannot have structural kind {}",
                self.kind
            )));
        }
        if let Some(default) = &self.default_value {
            self.check_stored(default)
                .map_err(|e| WitError::invalid_type(format!("default value {e}")))?;
        }
        Ok(())
    }

    /// Bring a declared value into stored form. Both the external form
    /// (`"2024-05-01T00:00:00Z"`, `1` for a float) and the stored form are
    /// accepted; the result is what `convert_to_model` would store.
    ///
    /// # Errors
    ///
    /// Returns the write-path error when neither form converts.
    pub fn normalize(&self, value: &Value) -> Result<Value> {
        self.convert_value(&FieldValue::from(value.clone()))
            .or_else(|_| self.convert_value(&self.convert_from_model(value)?))
    }

    /// Check that `value` is a stored value this type would write itself.
    /// The error message names the value and the kind.
    pub(crate) fn check_stored(&self, value: &Value) -> std::result::Result<(), String> {
        match self.normalize(value) {
            Ok(stored) if &stored == value => Ok(()),
            Ok(stored) => Err(format!(
                "{value} is not in the stored form of {} (expected {stored})",
                self.kind
            )),
            Err(e) => Err(format!("{value} does not match kind {}: {e}", self.kind)),
        }
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Replace the default value. `Null` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not convert to this type.
    pub fn set_default_value(&mut self, value: &FieldValue) -> Result<()> {
        self.default_value = if value.is_null() {
            None
        } else {
            Some(self.convert_value(value)?)
        };
        Ok(())
    }

    /// Convert an external value into its stored form. `Null` yields the
    /// default value (or stored null when there is none).
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when the value's shape does not fit the kind.
    pub fn convert_to_model(&self, value: &FieldValue) -> Result<Value> {
        if value.is_null() {
            return Ok(self.default_value.clone().unwrap_or(Value::Null));
        }
        self.convert_value(value)
    }

    /// Conversion without default substitution.
    pub(crate) fn convert_value(&self, value: &FieldValue) -> Result<Value> {
        match (self.kind, value) {
            (_, FieldValue::Null) => Ok(Value::Null),
            (
                Kind::String
                | Kind::User
                | Kind::Iteration
                | Kind::Area
                | Kind::Label
                | Kind::BoardColumn,
                FieldValue::String(s),
            ) => Ok(Value::String(s.clone())),
            (Kind::Url, FieldValue::String(s)) if is_url(s) => Ok(Value::String(s.clone())),
            (Kind::Integer, v) => to_integer(v)
                .map(Value::from)
                .ok_or_else(|| mismatch(v, "integer")),
            (Kind::Float, v) => to_float(v)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch(v, "float")),
            (Kind::Boolean, FieldValue::Boolean(b)) => Ok(Value::Bool(*b)),
            (Kind::Instant, v) => to_instant(v)
                .and_then(|dt| dt.timestamp_nanos_opt())
                .map(Value::from)
                .ok_or_else(|| mismatch(v, "instant")),
            (Kind::Markup, v) => to_markup(v).map(|markup| Value::Object(markup.to_map())),
            (Kind::Codebase, v) => to_codebase(v).map(|codebase| Value::Object(codebase.to_map())),
            (Kind::Enum | Kind::List, _) => Err(WitError::invalid_type(format!(
                "simple type cannot have structural kind {}",
                self.kind
            ))),
            (Kind::Url, v) => Err(mismatch(v, "URL")),
            (Kind::Boolean, v) => Err(mismatch(v, "boolean")),
            (_, v) => Err(mismatch(v, "string")),
        }
    }

    /// Convert a stored value back to its external form.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when the stored JSON has the wrong shape.
    pub fn convert_from_model(&self, value: &Value) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        let converted = match self.kind {
            Kind::String
            | Kind::User
            | Kind::Iteration
            | Kind::Area
            | Kind::Label
            | Kind::BoardColumn
            | Kind::Url => value.as_str().map(FieldValue::from),
            Kind::Integer => value
                .as_number()
                .and_then(whole_number)
                .map(FieldValue::Integer),
            Kind::Float => value.as_f64().map(FieldValue::Float),
            Kind::Boolean => value.as_bool().map(FieldValue::Boolean),
            Kind::Instant => value
                .as_number()
                .and_then(whole_number)
                .map(|nanos| FieldValue::Instant(Utc.timestamp_nanos(nanos))),
            Kind::Markup => {
                return match value.as_object() {
                    Some(map) => MarkupContent::from_map(map).map(FieldValue::Markup),
                    None => Err(WitError::mismatch(value, "markup content", "non-object")),
                };
            }
            Kind::Codebase => {
                return match value.as_object() {
                    Some(map) => CodebaseContent::from_map(map).map(FieldValue::Codebase),
                    None => Err(WitError::mismatch(value, "codebase content", "non-object")),
                };
            }
            Kind::Enum | Kind::List => {
                return Err(WitError::invalid_type(format!(
                    "simple type cannot have structural kind {}",
                    self.kind
                )));
            }
        };
        converted.ok_or_else(|| {
            WitError::mismatch(value, self.kind.as_str(), stored_shape(value))
        })
    }
}

fn mismatch(value: &FieldValue, expected: &str) -> WitError {
    WitError::mismatch(value, expected, value.shape())
}

const fn stored_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_url(s: &str) -> bool {
    Url::parse(s.trim()).is_ok_and(|url| url.has_host())
}

fn to_integer(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Integer(i) => Some(*i),
        FieldValue::Float(f) => integral(*f),
        FieldValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn to_float(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Float(f) if f.is_finite() => Some(*f),
        FieldValue::Integer(i) => Some(*i as f64),
        FieldValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn to_instant(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Instant(dt) => Some(*dt),
        FieldValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn to_markup(value: &FieldValue) -> Result<MarkupContent> {
    match value {
        FieldValue::Markup(markup) => Ok(markup.clone()),
        FieldValue::Map(map) => MarkupContent::from_map(map),
        other => Err(mismatch(other, "markup content")),
    }
}

fn to_codebase(value: &FieldValue) -> Result<CodebaseContent> {
    let codebase = match value {
        FieldValue::Codebase(codebase) => codebase.clone(),
        FieldValue::Map(map) => CodebaseContent::from_map(map)?,
        other => return Err(mismatch(other, "codebase content")),
    };
    codebase.validate()?;
    Ok(codebase)
}
