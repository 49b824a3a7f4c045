//! On-demand joins to tables related to `work_items`.
//!
//! A field name such as `iteration.name` activates the join whose prefix it
//! carries. Each compile run works on its own [`JoinRegistry`] copy, so the
//! `active` flags never leak between runs.

use crate::query::compiler::CompileError;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

impl JoinKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Left => "LEFT JOIN",
            Self::Inner => "JOIN",
        }
    }
}

/// Descriptor of a join to one related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableJoin {
    pub name: &'static str,
    pub table_name: &'static str,
    pub table_alias: &'static str,
    /// ON condition, written against the `work_items` base table and the alias.
    pub on: &'static str,
    pub kind: JoinKind,
    /// Field name prefixes routed through this join.
    pub prefix_activators: &'static [&'static str],
    /// If non-empty, only these columns may be queried.
    pub allowed_columns: &'static [&'static str],
    pub disallowed_columns: &'static [&'static str],
    /// Joins this one depends on.
    pub activate_other_joins: &'static [&'static str],
    /// Document field whose value references this table's rows.
    pub hierarchy_field: Option<&'static str>,
    /// Materialized path column used for descendant queries.
    pub path_column: Option<&'static str>,
    pub active: bool,
    /// Field names resolved through this join, for diagnostics.
    pub handled_fields: Vec<String>,
}

impl TableJoin {
    const fn new(
        name: &'static str,
        table_name: &'static str,
        table_alias: &'static str,
        on: &'static str,
    ) -> Self {
        Self {
            name,
            table_name,
            table_alias,
            on,
            kind: JoinKind::Left,
            prefix_activators: &[],
            allowed_columns: &[],
            disallowed_columns: &[],
            activate_other_joins: &[],
            hierarchy_field: None,
            path_column: None,
            active: false,
            handled_fields: Vec::new(),
        }
    }

    fn prefixes(mut self, prefixes: &'static [&'static str]) -> Self {
        self.prefix_activators = prefixes;
        self
    }

    fn allow(mut self, columns: &'static [&'static str]) -> Self {
        self.allowed_columns = columns;
        self
    }

    fn deny(mut self, columns: &'static [&'static str]) -> Self {
        self.disallowed_columns = columns;
        self
    }

    fn activates(mut self, joins: &'static [&'static str]) -> Self {
        self.activate_other_joins = joins;
        self
    }

    fn hierarchy(mut self, field: &'static str, path_column: &'static str) -> Self {
        self.hierarchy_field = Some(field);
        self.path_column = Some(path_column);
        self
    }

    /// The longest activating prefix of `field`, if any.
    #[must_use]
    pub fn matching_prefix(&self, field: &str) -> Option<&'static str> {
        self.prefix_activators
            .iter()
            .copied()
            .filter(|prefix| field.starts_with(prefix))
            .max_by_key(|prefix| prefix.len())
    }

    /// Translate `field` (which must carry one of this join's prefixes) into
    /// `alias.column`.
    ///
    /// # Errors
    ///
    /// Returns a `CompileError` if the column part is empty, contains quotes,
    /// is not a plain identifier, or is excluded by the allow/deny lists.
    pub fn translate_field_name(&self, field: &str) -> Result<String, CompileError> {
        let column = self
            .matching_prefix(field)
            .map_or(field, |prefix| &field[prefix.len()..]);
        if column.is_empty() {
            return Err(CompileError::EmptyColumn {
                field: field.to_string(),
            });
        }
        if column.contains(['\'', '"']) {
            return Err(CompileError::QuoteInFieldName {
                field: field.to_string(),
            });
        }
        if !is_identifier(column) {
            return Err(CompileError::InvalidColumn {
                field: field.to_string(),
            });
        }
        let allowed = self.allowed_columns.is_empty() || self.allowed_columns.contains(&column);
        if !allowed || self.disallowed_columns.contains(&column) {
            return Err(CompileError::ColumnNotAllowed {
                column: column.to_string(),
                join: self.name.to_string(),
            });
        }
        Ok(format!("{}.{column}", self.table_alias))
    }

    #[must_use]
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} {} ON {}",
            self.kind.as_sql(),
            self.table_name,
            self.table_alias,
            self.on
        )
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

static DEFAULT_JOINS: LazyLock<Vec<TableJoin>> = LazyLock::new(|| {
    vec![
        TableJoin::new("space", "spaces", "space", "space.id = work_items.space_id")
            .prefixes(&["space."]),
        TableJoin::new("work_item_type", "work_item_types", "wit", "wit.id = work_items.type")
            .prefixes(&["wit.", "workitemtype.", "work_item_type.", "type."])
            .deny(&["fields"]),
        TableJoin::new(
            "iteration",
            "iterations",
            "iter",
            r#"work_items.fields @> concat('{"system_iteration": "', iter.id, '"}')::jsonb"#,
        )
        .prefixes(&["iteration."])
        .hierarchy("system_iteration", "path"),
        TableJoin::new(
            "area",
            "areas",
            "ar",
            r#"work_items.fields @> concat('{"system_area": "', ar.id, '"}')::jsonb"#,
        )
        .prefixes(&["area."])
        .hierarchy("system_area", "path"),
        TableJoin::new(
            "codebase",
            "codebases",
            "cb",
            r#"work_items.fields @> concat('{"system_codebase": {"codebaseid": "', cb.id, '"}}')::jsonb"#,
        )
        .prefixes(&["codebase."]),
        TableJoin::new(
            "creator",
            "identities",
            "creator",
            r#"work_items.fields @> concat('{"system_creator": "', creator.id, '"}')::jsonb"#,
        )
        .prefixes(&["creator.", "author."])
        .allow(&["id", "username", "full_name"]),
        // 25c326a7-... is the parent/child link type.
        TableJoin::new(
            "parent_link",
            "work_item_links",
            "parent_link",
            "parent_link.target_id = work_items.id AND parent_link.link_type_id = '25c326a7-6d03-4f5a-b23b-86a9ee4171e9'",
        ),
        TableJoin::new("parent", "work_items", "parent", "parent.id = parent_link.source_id")
            .prefixes(&["parent."])
            .activates(&["parent_link"])
            .allow(&["id", "number", "type"]),
    ]
});

/// A private copy of the join descriptors for one compile run.
#[derive(Debug, Clone)]
pub struct JoinRegistry {
    joins: Vec<TableJoin>,
}

impl Default for JoinRegistry {
    fn default() -> Self {
        Self {
            joins: DEFAULT_JOINS.clone(),
        }
    }
}

impl JoinRegistry {
    #[must_use]
    pub const fn new(joins: Vec<TableJoin>) -> Self {
        Self { joins }
    }

    /// The join routing `field`. Among several candidates the one with the
    /// longest matching prefix wins.
    #[must_use]
    pub fn find_by_field(&self, field: &str) -> Option<&TableJoin> {
        self.joins
            .iter()
            .filter_map(|join| join.matching_prefix(field).map(|p| (p.len(), join)))
            .max_by_key(|(len, _)| *len)
            .map(|(_, join)| join)
    }

    /// The join that resolves hierarchy queries on document field `field`.
    #[must_use]
    pub fn find_hierarchy(&self, field: &str) -> Option<&TableJoin> {
        self.joins
            .iter()
            .find(|join| join.hierarchy_field == Some(field))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableJoin> {
        self.joins.iter().find(|join| join.name == name)
    }

    /// Mark `name` active, record `field` against it, and activate the joins
    /// it depends on, transitively.
    pub fn activate(&mut self, name: &str, field: &str) {
        let mut pending = vec![name.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(join) = self.joins.iter_mut().find(|join| join.name == current) else {
                continue;
            };
            if !join.active {
                trace!(join = join.name, "Activating join");
            }
            join.active = true;
            if current == name {
                join.handled_fields.push(field.to_string());
            }
            pending.extend(join.activate_other_joins.iter().map(|s| (*s).to_string()));
        }
    }

    /// Keep only the active joins, in registry order.
    #[must_use]
    pub fn into_active(self) -> ActiveJoins {
        ActiveJoins {
            joins: self.joins.into_iter().filter(|join| join.active).collect(),
        }
    }
}

/// The joins a compiled expression needs, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveJoins {
    joins: Vec<TableJoin>,
}

impl ActiveJoins {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableJoin> {
        self.joins.iter().find(|join| join.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableJoin> {
        self.joins.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.joins.iter().map(|join| join.name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Join clauses separated by single spaces.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.joins
            .iter()
            .map(TableJoin::to_sql)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'a> IntoIterator for &'a ActiveJoins {
    type Item = &'a TableJoin;
    type IntoIter = std::slice::Iter<'a, TableJoin>;

    fn into_iter(self) -> Self::IntoIter {
        self.joins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_prefixed_fields() {
        let registry = JoinRegistry::default();
        let join = registry.find_by_field("iteration.name").unwrap();
        assert_eq!(join.name, "iteration");
        assert_eq!(join.translate_field_name("iteration.name").unwrap(), "iter.name");
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = JoinRegistry::new(vec![
            TableJoin::new("short", "t1", "a", "true").prefixes(&["foo."]),
            TableJoin::new("long", "t2", "b", "true").prefixes(&["foo.bar."]),
        ]);
        assert_eq!(registry.find_by_field("foo.bar.x").unwrap().name, "long");
        assert_eq!(registry.find_by_field("foo.x").unwrap().name, "short");
        assert!(registry.find_by_field("foo").is_none());
    }

    #[test]
    fn rejects_bad_columns() {
        let registry = JoinRegistry::default();
        let iteration = registry.get("iteration").unwrap();
        assert!(matches!(
            iteration.translate_field_name("iteration."),
            Err(CompileError::EmptyColumn { .. })
        ));
        assert!(matches!(
            iteration.translate_field_name("iteration.na'me"),
            Err(CompileError::QuoteInFieldName { .. })
        ));
        assert!(matches!(
            iteration.translate_field_name("iteration.name;drop"),
            Err(CompileError::InvalidColumn { .. })
        ));
        let creator = registry.get("creator").unwrap();
        assert!(matches!(
            creator.translate_field_name("creator.email"),
            Err(CompileError::ColumnNotAllowed { .. })
        ));
        let wit = registry.get("work_item_type").unwrap();
        assert!(wit.translate_field_name("type.fields").is_err());
        assert_eq!(wit.translate_field_name("type.name").unwrap(), "wit.name");
    }

    #[test]
    fn activation_is_transitive_and_ordered() {
        let mut registry = JoinRegistry::default();
        registry.activate("parent", "parent.number");
        registry.activate("space", "space.name");
        let active = registry.into_active();
        assert_eq!(active.names(), vec!["space", "parent_link", "parent"]);
        assert_eq!(
            active.get("parent").unwrap().handled_fields,
            vec!["parent.number".to_string()]
        );
        assert!(active.get("parent_link").unwrap().handled_fields.is_empty());
    }

    #[test]
    fn fresh_registries_are_independent() {
        let mut first = JoinRegistry::default();
        first.activate("area", "area.name");
        assert!(JoinRegistry::default().into_active().is_empty());
        assert_eq!(first.into_active().len(), 1);
    }

    #[test]
    fn join_clause_sql() {
        let registry = JoinRegistry::default();
        assert_eq!(
            registry.get("space").unwrap().to_sql(),
            "LEFT JOIN spaces space ON space.id = work_items.space_id"
        );
    }
}
