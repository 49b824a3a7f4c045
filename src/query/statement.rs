//! Assemble full `SELECT` statements from compiled predicates.

use crate::criteria::Expression;
use crate::error::{Result, WitError};
use crate::query::compiler::{BASE_TABLE, Compiled, Compiler};
use serde::Serialize;
use serde_json::Value;

/// Paging applied after ordering by work item number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A parameterized statement with `?` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectStatement {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl SelectStatement {
    /// Wrap a compiled predicate in a `SELECT` over `work_items` with its
    /// joins attached in registry order.
    ///
    /// # Errors
    ///
    /// Returns `Compile` if the predicate carries errors.
    pub fn build(compiled: Compiled, page: Page) -> Result<Self> {
        let compiled = compiled.into_result()?;
        if compiled.where_clause.is_empty() {
            return Err(WitError::Compile { errors: Vec::new() });
        }
        let mut sql = format!("SELECT {BASE_TABLE}.* FROM {BASE_TABLE}");
        if !compiled.joins.is_empty() {
            sql.push(' ');
            sql.push_str(&compiled.joins.to_sql());
        }
        sql.push_str(" WHERE ");
        sql.push_str(&compiled.where_clause);
        sql.push_str(&format!(" ORDER BY {BASE_TABLE}.number"));

        let mut parameters = compiled.parameters;
        if let Some(limit) = page.limit {
            sql.push_str(" LIMIT ?");
            parameters.push(Value::from(limit));
        }
        if let Some(offset) = page.offset {
            sql.push_str(" OFFSET ?");
            parameters.push(Value::from(offset));
        }
        Ok(Self { sql, parameters })
    }

    /// The statement with `$1..$n` placeholders.
    #[must_use]
    pub fn to_postgres(&self) -> String {
        rebind_postgres(&self.sql)
    }
}

/// Compile `expression` with qualified columns and build the statement.
///
/// # Errors
///
/// Returns `Compile` carrying every compile error.
pub fn select_work_items(expression: &Expression, page: Page) -> Result<SelectStatement> {
    let compiled = Compiler::new().qualified(true).compile(expression);
    SelectStatement::build(compiled, page)
}

/// Rewrite `?` placeholders to numbered `$n` ones. Question marks inside
/// quoted literals or identifiers are left alone.
#[must_use]
pub fn rebind_postgres(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}
