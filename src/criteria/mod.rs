//! Criteria expressions: the boolean query language over logical field names.
//!
//! Expressions are plain trees. Build them with the helper functions in this
//! module or parse them from JSON with [`filter::parse_filter`], then hand them
//! to [`crate::query::Compiler`].

pub mod filter;

use serde_json::Value;
use std::fmt;

/// One node of a criteria expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Reference to a logical field name.
    Field(String),
    /// A constant value.
    Literal(Value),
    /// A late-bound placeholder.
    Parameter,
    Equals(Box<Self>, Box<Self>),
    /// Case-insensitive substring match of the right operand within the left.
    Substring(Box<Self>, Box<Self>),
    IsNull(String),
    /// Inequality.
    Not(Box<Self>, Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    /// The left field's value is the right id or one of its descendants.
    Child(Box<Self>, Box<Self>),
}

impl Expression {
    /// Left operand of a binary node.
    #[must_use]
    pub fn left(&self) -> Option<&Self> {
        match self {
            Self::Equals(l, _)
            | Self::Substring(l, _)
            | Self::Not(l, _)
            | Self::And(l, _)
            | Self::Or(l, _)
            | Self::Child(l, _) => Some(l.as_ref()),
            Self::Field(_) | Self::Literal(_) | Self::Parameter | Self::IsNull(_) => None,
        }
    }

    /// Right operand of a binary node.
    #[must_use]
    pub fn right(&self) -> Option<&Self> {
        match self {
            Self::Equals(_, r)
            | Self::Substring(_, r)
            | Self::Not(_, r)
            | Self::And(_, r)
            | Self::Or(_, r)
            | Self::Child(_, r) => Some(r.as_ref()),
            Self::Field(_) | Self::Literal(_) | Self::Parameter | Self::IsNull(_) => None,
        }
    }
}

#[must_use]
pub fn field(name: impl Into<String>) -> Expression {
    Expression::Field(name.into())
}

#[must_use]
pub fn literal(value: impl Into<Value>) -> Expression {
    Expression::Literal(value.into())
}

#[must_use]
pub const fn parameter() -> Expression {
    Expression::Parameter
}

#[must_use]
pub fn equals(left: Expression, right: Expression) -> Expression {
    Expression::Equals(Box::new(left), Box::new(right))
}

#[must_use]
pub fn substring(left: Expression, right: Expression) -> Expression {
    Expression::Substring(Box::new(left), Box::new(right))
}

#[must_use]
pub fn is_null(name: impl Into<String>) -> Expression {
    Expression::IsNull(name.into())
}

#[must_use]
pub fn not(left: Expression, right: Expression) -> Expression {
    Expression::Not(Box::new(left), Box::new(right))
}

#[must_use]
pub fn and(left: Expression, right: Expression) -> Expression {
    Expression::And(Box::new(left), Box::new(right))
}

#[must_use]
pub fn or(left: Expression, right: Expression) -> Expression {
    Expression::Or(Box::new(left), Box::new(right))
}

#[must_use]
pub fn child(left: Expression, right: Expression) -> Expression {
    Expression::Child(Box::new(left), Box::new(right))
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Parameter => write!(f, "?"),
            Self::Equals(l, r) => write!(f, "({l} == {r})"),
            Self::Substring(l, r) => write!(f, "({l} contains {r})"),
            Self::IsNull(name) => write!(f, "({name} is null)"),
            Self::Not(l, r) => write!(f, "({l} != {r})"),
            Self::And(l, r) => write!(f, "({l} and {r})"),
            Self::Or(l, r) => write!(f, "({l} or {r})"),
            Self::Child(l, r) => write!(f, "({l} child of {r})"),
        }
    }
}
