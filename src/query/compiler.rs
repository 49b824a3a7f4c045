//! Criteria expression to SQL predicate compiler.
//!
//! Each field name resolves, in order, to a joined table column (when it
//! carries a join prefix), a base column of `work_items`, or a key in the
//! `fields` JSON document. Comparisons involving a document key compile to
//! jsonb containment with the value inlined as JSON text; everything else
//! uses `?` placeholders with bound parameters in left-to-right order.
//!
//! The compiler never stops at the first problem. All errors found anywhere
//! in the tree are collected so a caller can report them together.

use crate::criteria::Expression;
use crate::query::join::{ActiveJoins, JoinRegistry};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const BASE_TABLE: &str = "work_items";
pub const DOCUMENT_COLUMN: &str = "fields";

/// Logical names of the physical `work_items` columns.
const BASE_COLUMNS: [(&str, &str); 5] = [
    ("ID", "id"),
    ("Type", "type"),
    ("Version", "version"),
    ("Number", "number"),
    ("SpaceID", "space_id"),
];

fn base_column(name: &str) -> Option<&'static str> {
    BASE_COLUMNS
        .iter()
        .find(|(logical, _)| *logical == name)
        .map(|(_, physical)| *physical)
}

/// A problem found while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("field name must not contain quotes: {field}")]
    QuoteInFieldName { field: String },

    #[error("field name {field:?} does not name a column")]
    EmptyColumn { field: String },

    #[error("field name {field} is not a plain column identifier")]
    InvalidColumn { field: String },

    #[error("column {column} cannot be queried through the {join} join")]
    ColumnNotAllowed { column: String, join: String },

    #[error("field {field} has no hierarchy to search for children")]
    NoHierarchy { field: String },

    #[error("{operator} expects {expected}, got {found}")]
    UnexpectedOperand {
        operator: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("unsupported literal in document comparison: {value}")]
    UnsupportedLiteral { value: String },

    #[error("parameter nodes are not supported; bind values as literals")]
    ParameterUnsupported,
}

/// Where a field name lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    /// A physical column, possibly on a joined table.
    Sql(String),
    /// A key of the JSON document column.
    Document(String),
}

/// Output of one compile run.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// The predicate, or empty when compilation failed.
    pub where_clause: String,
    /// Values for the `?` placeholders, in order.
    pub parameters: Vec<Value>,
    /// Joins the predicate refers to.
    pub joins: ActiveJoins,
    pub errors: Vec<CompileError>,
}

impl Compiled {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && !self.where_clause.is_empty()
    }

    /// Turn accumulated errors into a single `WitError::Compile`.
    ///
    /// # Errors
    ///
    /// Returns `Compile` carrying every error when any were recorded.
    pub fn into_result(self) -> crate::error::Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(crate::error::WitError::Compile {
                errors: self.errors,
            })
        }
    }
}

/// Compile with default settings.
#[must_use]
pub fn compile(expression: &Expression) -> Compiled {
    Compiler::new().compile(expression)
}

/// Single-use compiler state: a private join registry plus the parameters and
/// errors accumulated so far.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    qualify: bool,
    joins: JoinRegistry,
    parameters: Vec<Value>,
    errors: Vec<CompileError>,
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix base columns with the table name. Needed whenever the
    /// predicate is combined with joins.
    #[must_use]
    pub const fn qualified(mut self, qualify: bool) -> Self {
        self.qualify = qualify;
        self
    }

    #[must_use]
    pub fn with_joins(mut self, joins: JoinRegistry) -> Self {
        self.joins = joins;
        self
    }

    #[must_use]
    pub fn compile(mut self, expression: &Expression) -> Compiled {
        let sql = self.node(expression);
        let compiled = Compiled {
            where_clause: sql.unwrap_or_default(),
            parameters: self.parameters,
            joins: self.joins.into_active(),
            errors: self.errors,
        };
        debug!(
            sql = %compiled.where_clause,
            parameters = compiled.parameters.len(),
            joins = ?compiled.joins.names(),
            errors = compiled.errors.len(),
            "Compiled criteria expression"
        );
        compiled
    }

    fn column(&self, physical: &str) -> String {
        if self.qualify {
            format!("{BASE_TABLE}.{physical}")
        } else {
            physical.to_string()
        }
    }

    fn document_column(&self) -> String {
        self.column(DOCUMENT_COLUMN)
    }

    /// Does `name` resolve into the JSON document? Pure; no joins activated.
    fn is_document_field(&self, name: &str) -> bool {
        self.joins.find_by_field(name).is_none() && base_column(name).is_none()
    }

    /// JSON context of a comparison subtree.
    fn in_document(&self, expression: &Expression) -> bool {
        match expression {
            Expression::Field(name) => self.is_document_field(name),
            Expression::Equals(l, r) | Expression::Substring(l, r) | Expression::Not(l, r) => {
                self.in_document(l) || self.in_document(r)
            }
            _ => false,
        }
    }

    fn resolve(&mut self, name: &str) -> Option<Column> {
        let routed = self
            .joins
            .find_by_field(name)
            .map(|join| (join.name, join.translate_field_name(name)));
        if let Some((join_name, translated)) = routed {
            return match translated {
                Ok(column) => {
                    self.joins.activate(join_name, name);
                    Some(Column::Sql(column))
                }
                Err(e) => {
                    self.errors.push(e);
                    None
                }
            };
        }
        if let Some(physical) = base_column(name) {
            return Some(Column::Sql(self.column(physical)));
        }
        if name.contains(['\'', '"']) {
            self.errors.push(CompileError::QuoteInFieldName {
                field: name.to_string(),
            });
            return None;
        }
        if name.is_empty() {
            self.errors.push(CompileError::EmptyColumn {
                field: String::new(),
            });
            return None;
        }
        Some(Column::Document(name.to_string()))
    }

    fn node(&mut self, expression: &Expression) -> Option<String> {
        match expression {
            Expression::Field(name) => match self.resolve(name)? {
                Column::Sql(column) => Some(column),
                Column::Document(key) => Some(format!("{}->>'{key}'", self.document_column())),
            },
            Expression::Literal(value) => Some(self.bind(value.clone())),
            Expression::Parameter => {
                self.errors.push(CompileError::ParameterUnsupported);
                None
            }
            Expression::Equals(l, r) => {
                if self.in_document(expression) {
                    self.containment("Equals", l, r)
                } else {
                    self.binary(l, r, "=")
                }
            }
            Expression::Not(l, r) => {
                if self.in_document(expression) {
                    self.containment("Not", l, r).map(|sql| format!("NOT {sql}"))
                } else {
                    self.binary(l, r, "!=")
                }
            }
            Expression::Substring(l, r) => self.substring(l, r),
            Expression::IsNull(name) => match self.resolve(name)? {
                Column::Sql(column) => Some(format!("({column} IS NULL)")),
                Column::Document(key) => {
                    Some(format!("({}->>'{key}' IS NULL)", self.document_column()))
                }
            },
            Expression::And(l, r) => self.binary(l, r, "AND"),
            Expression::Or(l, r) => self.binary(l, r, "OR"),
            Expression::Child(l, r) => self.child(l, r),
        }
    }

    /// Compile both operands (so errors from both sides are collected) and
    /// join them with `operator`.
    fn binary(&mut self, l: &Expression, r: &Expression, operator: &str) -> Option<String> {
        let left = self.node(l);
        let right = self.node(r);
        Some(format!("({} {operator} {})", left?, right?))
    }

    fn bind(&mut self, value: Value) -> String {
        self.parameters.push(value);
        "?".to_string()
    }

    /// `(fields @> '{"key" : value}')` for a document field compared with a
    /// literal, in either operand order.
    fn containment(
        &mut self,
        operator: &'static str,
        l: &Expression,
        r: &Expression,
    ) -> Option<String> {
        let (name, value) = match (l, r) {
            (Expression::Field(name), Expression::Literal(value))
            | (Expression::Literal(value), Expression::Field(name)) => (name, value),
            _ => {
                let left = self.node(l);
                let right = self.node(r);
                if left.is_some() && right.is_some() {
                    self.errors.push(CompileError::UnexpectedOperand {
                        operator,
                        expected: "a document field and a literal",
                        found: format!("{l} and {r}"),
                    });
                }
                return None;
            }
        };
        let key = match self.resolve(name)? {
            Column::Document(key) => key,
            Column::Sql(column) => {
                self.errors.push(CompileError::UnexpectedOperand {
                    operator,
                    expected: "a document field",
                    found: column,
                });
                return None;
            }
        };
        let json = match document_literal(value) {
            Ok(json) => json,
            Err(e) => {
                self.errors.push(e);
                return None;
            }
        };
        let key = serde_json::Value::String(key).to_string();
        let object = format!("{{{key} : {json}}}").replace('\'', "''");
        Some(format!("({} @> '{object}')", self.document_column()))
    }

    fn substring(&mut self, l: &Expression, r: &Expression) -> Option<String> {
        let target = match l {
            Expression::Field(name) => match self.resolve(name) {
                Some(Column::Document(key)) => {
                    Some(format!("{}->>'{key}'", self.document_column()))
                }
                Some(Column::Sql(column)) => Some(format!("{column}::text")),
                None => None,
            },
            other => {
                self.errors.push(CompileError::UnexpectedOperand {
                    operator: "Substring",
                    expected: "a field on the left",
                    found: other.to_string(),
                });
                None
            }
        };
        let pattern = match r {
            Expression::Literal(Value::String(term)) => Some(format!("%{}%", escape_like(term))),
            other => {
                self.errors.push(CompileError::UnexpectedOperand {
                    operator: "Substring",
                    expected: "a string literal on the right",
                    found: other.to_string(),
                });
                None
            }
        };
        let (target, pattern) = (target?, pattern?);
        let placeholder = self.bind(Value::String(pattern));
        Some(format!("({target} ILIKE {placeholder})"))
    }

    /// Descendants of a hierarchy node: the field's value must be the id of a
    /// row whose path lies under the path of the row named by the literal.
    fn child(&mut self, l: &Expression, r: &Expression) -> Option<String> {
        let Expression::Field(name) = l else {
            self.errors.push(CompileError::UnexpectedOperand {
                operator: "Child",
                expected: "a field on the left",
                found: l.to_string(),
            });
            return None;
        };
        let hierarchy = self
            .joins
            .find_hierarchy(name)
            .map(|join| (join.table_name, join.table_alias, join.path_column));
        let Some((table, alias, Some(path))) = hierarchy else {
            self.errors.push(CompileError::NoHierarchy {
                field: name.clone(),
            });
            return None;
        };
        let Expression::Literal(id) = r else {
            self.errors.push(CompileError::UnexpectedOperand {
                operator: "Child",
                expected: "a literal id on the right",
                found: r.to_string(),
            });
            return None;
        };
        let placeholder = self.bind(id.clone());
        Some(format!(
            "({document}->>'{name}' IN (SELECT {alias}.id::text FROM {table} {alias} \
             WHERE {alias}.space_id = {BASE_TABLE}.space_id \
             AND {alias}.{path} <@ (SELECT {alias}_root.{path} FROM {table} {alias}_root \
             WHERE {alias}_root.id = {placeholder})))",
            document = self.document_column(),
        ))
    }
}

/// JSON text for a literal inlined into a containment document.
fn document_literal(value: &Value) -> Result<String, CompileError> {
    let supported = match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
        Value::Array(items) => items
            .iter()
            .all(|item| matches!(item, Value::String(_) | Value::Number(_) | Value::Bool(_))),
        Value::Null | Value::Object(_) => false,
    };
    if supported {
        Ok(value.to_string())
    } else {
        Err(CompileError::UnsupportedLiteral {
            value: value.to_string(),
        })
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
