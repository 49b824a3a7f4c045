//! `SQLite` storage implementation.

use crate::error::{Result, WitError};
use crate::model::{FieldValue, WorkItem, WorkItemType};
use crate::storage::cache::TypeCache;
use crate::storage::schema::apply_schema;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const TYPE_COLUMNS: &str =
    "id, name, description, icon, extended_type_id, can_construct, version, fields";
const ITEM_COLUMNS: &str = "id, space_id, number, type, version, fields, created_at, updated_at";

/// SQLite-based storage backend for work item types and work items.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    cache: Arc<TypeCache>,
}

/// A work item row before its document is converted.
struct ItemRow {
    id: Uuid,
    space_id: Uuid,
    number: i64,
    type_id: Uuid,
    version: i64,
    document: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        debug!(path = %path.display(), "Opened work item store");
        Ok(Self {
            conn,
            cache: Arc::new(TypeCache::new()),
        })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            cache: Arc::new(TypeCache::new()),
        })
    }

    /// Share `cache` with other stores in the process.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TypeCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<TypeCache> {
        &self.cache
    }

    /// Run `f` inside an immediate transaction, committing on success.
    ///
    /// # Errors
    ///
    /// Returns the closure's error or a database error. The transaction is
    /// rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        debug!(op, "Committed mutation");
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Work item types
    // ------------------------------------------------------------------

    /// Store a new work item type. When `extended_type_id` is set the base
    /// type's fields are merged in first.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound` for a missing base, `Incompatible` for a
    /// conflicting inherited field, validation errors, or `DuplicateType`.
    pub fn create_type(&mut self, work_item_type: WorkItemType) -> Result<Arc<WorkItemType>> {
        let work_item_type = match work_item_type.extended_type_id {
            Some(base_id) => {
                let base = self.get_type(&base_id)?;
                work_item_type.extend(&base)?
            }
            None => work_item_type,
        };
        work_item_type.validate()?;
        if self.find_type_by_name(&work_item_type.name)?.is_some() {
            return Err(WitError::DuplicateType {
                name: work_item_type.name,
            });
        }

        let fields = serde_json::to_string(&work_item_type.fields)?;
        let now = Utc::now().to_rfc3339();
        self.mutate("create_type", |tx| {
            tx.execute(
                "INSERT INTO work_item_types (
                    id, name, description, icon, extended_type_id, can_construct,
                    version, fields, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    work_item_type.id.to_string(),
                    work_item_type.name,
                    work_item_type.description,
                    work_item_type.icon,
                    work_item_type.extended_type_id.map(|id| id.to_string()),
                    work_item_type.can_construct,
                    work_item_type.version,
                    fields,
                    now,
                    now,
                ],
            )?;
            Ok(())
        })?;

        info!(id = %work_item_type.id, name = %work_item_type.name, "Created work item type");
        Ok(self.cache.put(work_item_type))
    }

    /// Look up a type by id, through the cache.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound` if no such type exists.
    pub fn get_type(&self, id: &Uuid) -> Result<Arc<WorkItemType>> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(cached);
        }
        let sql = format!("SELECT {TYPE_COLUMNS} FROM work_item_types WHERE id = ?");
        let found = self
            .conn
            .query_row(&sql, [id.to_string()], type_from_row)
            .optional()?;
        match found {
            Some(work_item_type) => Ok(self.cache.put(work_item_type)),
            None => Err(WitError::TypeNotFound { id: id.to_string() }),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn find_type_by_name(&self, name: &str) -> Result<Option<Arc<WorkItemType>>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM work_item_types WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => {
                let id = Uuid::parse_str(&id).map_err(|e| WitError::Other(e.into()))?;
                self.get_type(&id).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Resolve a type given either its id or its name.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound` if neither matches.
    pub fn resolve_type(&self, id_or_name: &str) -> Result<Arc<WorkItemType>> {
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            return self.get_type(&id);
        }
        self.find_type_by_name(id_or_name)?
            .ok_or_else(|| WitError::TypeNotFound {
                id: id_or_name.to_string(),
            })
    }

    /// All types, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_types(&self) -> Result<Vec<WorkItemType>> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM work_item_types ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let types = stmt
            .query_map([], type_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(types)
    }

    /// Replace a type's definition. `work_item_type.version` must match the
    /// stored version, and every existing field must survive with an
    /// assignment-compatible definition.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound`, `VersionConflict`, `Incompatible` or a
    /// validation error.
    pub fn update_type(&mut self, mut work_item_type: WorkItemType) -> Result<Arc<WorkItemType>> {
        let id = work_item_type.id;
        let old = self.get_type(&id)?;
        if old.version != work_item_type.version {
            return Err(WitError::VersionConflict {
                id: id.to_string(),
                expected: work_item_type.version,
                found: old.version,
            });
        }
        work_item_type.validate()?;
        work_item_type.check_evolution(&old)?;

        let expected = work_item_type.version;
        work_item_type.version += 1;
        let fields = serde_json::to_string(&work_item_type.fields)?;
        let now = Utc::now().to_rfc3339();
        let updated = self.mutate("update_type", |tx| {
            tx.execute(
                "UPDATE work_item_types
                 SET name = ?, description = ?, icon = ?, can_construct = ?,
                     version = ?, fields = ?, updated_at = ?
                 WHERE id = ? AND version = ?",
                rusqlite::params![
                    work_item_type.name,
                    work_item_type.description,
                    work_item_type.icon,
                    work_item_type.can_construct,
                    work_item_type.version,
                    fields,
                    now,
                    id.to_string(),
                    expected,
                ],
            )
            .map_err(WitError::from)
        })?;
        if updated == 0 {
            self.cache.remove(&id);
            return Err(WitError::VersionConflict {
                id: id.to_string(),
                expected,
                found: self.get_type(&id)?.version,
            });
        }

        info!(%id, version = work_item_type.version, "Updated work item type");
        Ok(self.cache.put(work_item_type))
    }

    // ------------------------------------------------------------------
    // Work items
    // ------------------------------------------------------------------

    /// Create a work item of type `type_id` in `space_id`. Every declared
    /// field is converted (and defaulted) through the type's definitions.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound`, a field conversion error, or a database error.
    pub fn create_item(
        &mut self,
        type_id: &Uuid,
        space_id: &Uuid,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<WorkItem> {
        let work_item_type = self.get_type(type_id)?;
        if !work_item_type.can_construct {
            return Err(WitError::validation(
                "type",
                format!("work item type {} cannot be instantiated", work_item_type.name),
            ));
        }
        let document = work_item_type.convert_to_model(fields)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let text = Value::Object(document).to_string();

        self.mutate("create_item", |tx| {
            let number: i64 = tx.query_row(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM work_items WHERE space_id = ?",
                [space_id.to_string()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO work_items (
                    id, space_id, number, type, version, fields, created_at, updated_at
                ) VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
                rusqlite::params![
                    id.to_string(),
                    space_id.to_string(),
                    number,
                    type_id.to_string(),
                    text,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;
            Ok(number)
        })?;

        info!(%id, %space_id, "Created work item");
        self.get_item(&id)
    }

    /// # Errors
    ///
    /// Returns `WorkItemNotFound`, or a conversion error if the stored
    /// document no longer fits the type.
    pub fn get_item(&self, id: &Uuid) -> Result<WorkItem> {
        let row = self.item_row(id)?;
        self.to_work_item(row)
    }

    /// Work items ordered by space and number, optionally limited to one space.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a document does not convert.
    pub fn list_items(&self, space_id: Option<&Uuid>) -> Result<Vec<WorkItem>> {
        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM work_items");
        let mut params: Vec<String> = Vec::new();
        if let Some(space_id) = space_id {
            sql.push_str(" WHERE space_id = ?");
            params.push(space_id.to_string());
        }
        sql.push_str(" ORDER BY space_id, number");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(|row| self.to_work_item(row)).collect()
    }

    /// Overwrite the given fields of a work item. Fields not mentioned keep
    /// their current values.
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict` if `expected_version` is stale, or a field
    /// conversion error.
    pub fn update_item(
        &mut self,
        id: &Uuid,
        expected_version: i64,
        changes: &BTreeMap<String, FieldValue>,
    ) -> Result<WorkItem> {
        let current = self.get_item(id)?;
        if current.version != expected_version {
            return Err(WitError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                found: current.version,
            });
        }
        let work_item_type = self.get_type(&current.type_id)?;
        let mut fields = current.fields;
        fields.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        let document = work_item_type.convert_to_model(&fields)?;

        self.write_item(id, &current.type_id, expected_version, &document, "update_item")?;
        self.get_item(id)
    }

    /// Move a work item to another type, converting every field the two
    /// types share. Fields only the old type declares are dropped; fields
    /// only the new type declares start from their defaults.
    ///
    /// # Errors
    ///
    /// Returns `TypeConversion` (wrapped with the field name) when a shared
    /// field's value cannot be converted; nothing is written in that case.
    pub fn change_item_type(&mut self, id: &Uuid, new_type_id: &Uuid) -> Result<WorkItem> {
        let row = self.item_row(id)?;
        let old_type = self.get_type(&row.type_id)?;
        let new_type = self.get_type(new_type_id)?;

        let mut document = Map::new();
        for (name, new_definition) in &new_type.fields {
            let stored = match (old_type.field(name), row.document.get(name)) {
                (Some(old_definition), Some(value)) => old_definition
                    .field_type
                    .convert_to_model_with_type(&new_definition.field_type, value)
                    .map_err(|e| e.in_field(name.as_str()))?,
                _ => new_definition.convert_to_model(name, &FieldValue::Null)?,
            };
            if !stored.is_null() {
                document.insert(name.clone(), stored);
            }
        }
        // Required fields must still hold after conversion.
        new_type.convert_from_model(&document)?;

        self.write_item(id, new_type_id, row.version, &document, "change_item_type")?;
        info!(%id, from = %old_type.name, to = %new_type.name, "Changed work item type");
        self.get_item(id)
    }

    fn write_item(
        &mut self,
        id: &Uuid,
        type_id: &Uuid,
        expected_version: i64,
        document: &Map<String, Value>,
        op: &str,
    ) -> Result<()> {
        let text = Value::Object(document.clone()).to_string();
        let now = Utc::now().to_rfc3339();
        let updated = self.mutate(op, |tx| {
            tx.execute(
                "UPDATE work_items
                 SET type = ?, fields = ?, version = version + 1, updated_at = ?
                 WHERE id = ? AND version = ?",
                rusqlite::params![type_id.to_string(), text, now, id.to_string(), expected_version],
            )
            .map_err(WitError::from)
        })?;
        if updated == 0 {
            let found = self.item_row(id)?.version;
            return Err(WitError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                found,
            });
        }
        Ok(())
    }

    fn item_row(&self, id: &Uuid) -> Result<ItemRow> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = ?");
        self.conn
            .query_row(&sql, [id.to_string()], item_from_row)
            .optional()?
            .ok_or_else(|| WitError::WorkItemNotFound { id: id.to_string() })
    }

    fn to_work_item(&self, row: ItemRow) -> Result<WorkItem> {
        let work_item_type = self.get_type(&row.type_id)?;
        let fields = work_item_type.convert_from_model(&row.document)?;
        Ok(WorkItem {
            id: row.id,
            number: row.number,
            type_id: row.type_id,
            space_id: row.space_id,
            version: row.version,
            fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn type_from_row(row: &Row) -> rusqlite::Result<WorkItemType> {
    let extended: Option<String> = row.get(4)?;
    let fields: String = row.get(7)?;
    Ok(WorkItemType {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        extended_type_id: extended
            .map(|id| Uuid::parse_str(&id))
            .transpose()
            .map_err(|e| conversion_error(4, e))?,
        can_construct: row.get(5)?,
        version: row.get(6)?,
        fields: serde_json::from_str(&fields).map_err(|e| conversion_error(7, e))?,
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<ItemRow> {
    let fields: String = row.get(5)?;
    let document: Map<String, Value> =
        serde_json::from_str(&fields).map_err(|e| conversion_error(5, e))?;
    Ok(ItemRow {
        id: uuid_column(row, 0)?,
        space_id: uuid_column(row, 1)?,
        number: row.get(2)?,
        type_id: uuid_column(row, 3)?,
        version: row.get(4)?,
        document,
        created_at: datetime_column(row, 6)?,
        updated_at: datetime_column(row, 7)?,
    })
}
