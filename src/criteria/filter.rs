//! JSON filter language.
//!
//! ```json
//! {"$AND": [{"state": "open"}, {"label": {"$IN": ["bug", "ui"]}}]}
//! ```
//!
//! An object with several keys is the conjunction of its keys. A key maps
//! either directly to a value (equality, `null` meaning "is null") or to an
//! operator object: `$EQ`, `$NE`, `$SUBSTR`, `$IN`, `$CHILD`.

use crate::criteria::{Expression, and, child, equals, field, is_null, literal, not, or, substring};
use crate::error::{Result, WitError};
use crate::model::work_item_type::{
    SYSTEM_AREA, SYSTEM_ASSIGNEES, SYSTEM_BOARDCOLUMNS, SYSTEM_CODEBASE, SYSTEM_CREATOR,
    SYSTEM_DESCRIPTION, SYSTEM_ITERATION, SYSTEM_LABELS, SYSTEM_STATE, SYSTEM_TITLE,
};
use serde_json::{Map, Value};

const AND: &str = "$AND";
const OR: &str = "$OR";
const EQ: &str = "$EQ";
const NE: &str = "$NE";
const SUBSTR: &str = "$SUBSTR";
const IN: &str = "$IN";
const CHILD: &str = "$CHILD";

/// Resolved filter key.
struct Key {
    name: &'static str,
    /// The field holds a list, so scalar values match by membership.
    list: bool,
}

fn resolve_key(key: &str) -> Option<Key> {
    let (name, list) = match key {
        "title" => (SYSTEM_TITLE, false),
        "description" => (SYSTEM_DESCRIPTION, false),
        "state" => (SYSTEM_STATE, false),
        "iteration" => (SYSTEM_ITERATION, false),
        "area" => (SYSTEM_AREA, false),
        "codebase" => (SYSTEM_CODEBASE, false),
        "creator" => (SYSTEM_CREATOR, false),
        "assignee" => (SYSTEM_ASSIGNEES, true),
        "label" => (SYSTEM_LABELS, true),
        "boardcolumn" => (SYSTEM_BOARDCOLUMNS, true),
        "space" => ("SpaceID", false),
        "type" | "workitemtype" => ("Type", false),
        "number" => ("Number", false),
        "id" => ("ID", false),
        _ => return None,
    };
    Some(Key { name, list })
}

/// Parse a filter given as JSON text.
///
/// # Errors
///
/// Returns `Filter` for malformed filters.
pub fn parse_filter_str(text: &str) -> Result<Expression> {
    let value: Value = serde_json::from_str(text).map_err(|e| WitError::Filter {
        reason: format!("not valid JSON: {e}"),
    })?;
    parse_filter(&value)
}

/// Turn a JSON filter into a criteria expression.
///
/// # Errors
///
/// Returns `Filter` naming the first malformed part.
pub fn parse_filter(value: &Value) -> Result<Expression> {
    let Value::Object(map) = value else {
        return Err(filter_error(format!("filter must be an object, got {value}")));
    };
    let mut clauses = Vec::with_capacity(map.len());
    for (key, value) in map {
        clauses.push(match key.as_str() {
            AND => fold_group(key, value, and)?,
            OR => fold_group(key, value, or)?,
            _ => parse_clause(key, value)?,
        });
    }
    fold(clauses, and).ok_or_else(|| filter_error("filter must not be empty"))
}

fn fold_group(
    key: &str,
    value: &Value,
    combine: fn(Expression, Expression) -> Expression,
) -> Result<Expression> {
    let Value::Array(items) = value else {
        return Err(filter_error(format!("{key} expects an array")));
    };
    let parsed = items.iter().map(parse_filter).collect::<Result<Vec<_>>>()?;
    fold(parsed, combine).ok_or_else(|| filter_error(format!("{key} must not be empty")))
}

fn fold(
    items: Vec<Expression>,
    combine: fn(Expression, Expression) -> Expression,
) -> Option<Expression> {
    items.into_iter().reduce(combine)
}

fn parse_clause(key: &str, value: &Value) -> Result<Expression> {
    if key.starts_with('$') {
        return Err(filter_error(format!("unknown operator {key}")));
    }
    let (name, list) = resolve_key(key).map_or((key, false), |k| (k.name, k.list));
    match value {
        Value::Null => Ok(is_null(name)),
        Value::Object(operator) => parse_operator(name, list, operator),
        scalar => Ok(equals(field(name), member(scalar, list))),
    }
}

fn parse_operator(name: &str, list: bool, operator: &Map<String, Value>) -> Result<Expression> {
    let mut entries = operator.iter();
    let (Some((op, operand)), None) = (entries.next(), entries.next()) else {
        return Err(filter_error(format!(
            "{name} expects exactly one operator, got {}",
            operator.len()
        )));
    };
    match op.as_str() {
        EQ if operand.is_null() => Ok(is_null(name)),
        EQ => Ok(equals(field(name), member(operand, list))),
        NE => Ok(not(field(name), member(operand, list))),
        SUBSTR => match operand {
            Value::String(s) => Ok(substring(field(name), literal(s.clone()))),
            other => Err(filter_error(format!("{SUBSTR} expects a string, got {other}"))),
        },
        IN => {
            let Value::Array(values) = operand else {
                return Err(filter_error(format!("{IN} expects an array")));
            };
            let alternatives = values
                .iter()
                .map(|v| equals(field(name), member(v, list)))
                .collect();
            fold(alternatives, or).ok_or_else(|| filter_error(format!("{IN} must not be empty")))
        }
        CHILD => match operand {
            Value::String(_) | Value::Number(_) => {
                Ok(child(field(name), literal(operand.clone())))
            }
            other => Err(filter_error(format!("{CHILD} expects an id, got {other}"))),
        },
        other => Err(filter_error(format!("unknown operator {other}"))),
    }
}

fn member(value: &Value, list: bool) -> Expression {
    if list && !value.is_array() {
        literal(Value::Array(vec![value.clone()]))
    } else {
        literal(value.clone())
    }
}

fn filter_error(reason: impl Into<String>) -> WitError {
    WitError::Filter {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_resolve_to_system_fields() {
        let expr = parse_filter(&json!({"state": "open"})).unwrap();
        assert_eq!(expr, equals(field(SYSTEM_STATE), literal("open")));
        let expr = parse_filter(&json!({"workitemtype": "abc"})).unwrap();
        assert_eq!(expr, equals(field("Type"), literal("abc")));
    }

    #[test]
    fn list_aliases_wrap_scalars() {
        let expr = parse_filter(&json!({"label": "bug"})).unwrap();
        assert_eq!(expr, equals(field(SYSTEM_LABELS), literal(json!(["bug"]))));
    }

    #[test]
    fn in_becomes_or_chain() {
        let expr = parse_filter(&json!({"number": {"$IN": [1, 2, 3]}})).unwrap();
        assert_eq!(
            expr,
            or(
                or(
                    equals(field("Number"), literal(1)),
                    equals(field("Number"), literal(2))
                ),
                equals(field("Number"), literal(3))
            )
        );
    }

    #[test]
    fn several_keys_are_conjoined() {
        let expr = parse_filter(&json!({"area": null, "title": {"$SUBSTR": "crash"}})).unwrap();
        assert_eq!(
            expr,
            and(
                is_null(SYSTEM_AREA),
                substring(field(SYSTEM_TITLE), literal("crash"))
            )
        );
    }

    #[test]
    fn groups_nest() {
        let expr = parse_filter(&json!({"$OR": [
            {"state": {"$NE": "closed"}},
            {"$AND": [{"iteration": {"$CHILD": "i-1"}}, {"foo": 3}]}
        ]}))
        .unwrap();
        assert_eq!(
            expr,
            or(
                not(field(SYSTEM_STATE), literal("closed")),
                and(
                    child(field(SYSTEM_ITERATION), literal("i-1")),
                    equals(field("foo"), literal(3))
                )
            )
        );
    }

    #[test]
    fn malformed_filters_are_rejected() {
        for bad in [
            json!([]),
            json!({}),
            json!({"$AND": []}),
            json!({"$AND": {"a": 1}}),
            json!({"$XOR": []}),
            json!({"a": {"$IN": []}}),
            json!({"a": {"$SUBSTR": 3}}),
            json!({"a": {"$EQ": 1, "$NE": 2}}),
            json!({"a": {"$LIKE": "x"}}),
        ] {
            let err = parse_filter(&bad).unwrap_err();
            assert!(matches!(err, WitError::Filter { .. }), "{bad}");
        }
    }

    #[test]
    fn text_must_be_json() {
        assert!(parse_filter_str("{state: open}").is_err());
        assert!(parse_filter_str(r#"{"state": "open"}"#).is_ok());
    }
}
