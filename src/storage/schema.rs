//! Database schema definitions.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Schema for the local work item store.
pub const SCHEMA_SQL: &str = r"
    -- Work item types; field definitions are a JSON object keyed by field name
    CREATE TABLE IF NOT EXISTS work_item_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        icon TEXT,
        extended_type_id TEXT REFERENCES work_item_types(id),
        can_construct INTEGER NOT NULL DEFAULT 1,
        version INTEGER NOT NULL DEFAULT 1,
        fields TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (length(name) >= 1)
    );

    -- Work items; all field values live in the fields document
    CREATE TABLE IF NOT EXISTS work_items (
        id TEXT PRIMARY KEY,
        space_id TEXT NOT NULL,
        number INTEGER NOT NULL,
        type TEXT NOT NULL REFERENCES work_item_types(id),
        version INTEGER NOT NULL DEFAULT 1,
        fields TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (space_id, number)
    );

    CREATE INDEX IF NOT EXISTS idx_work_items_space_id ON work_items(space_id);
    CREATE INDEX IF NOT EXISTS idx_work_items_type ON work_items(type);

    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema and connection pragmas.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?)",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}
