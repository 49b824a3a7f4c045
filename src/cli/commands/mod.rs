//! Command implementations.

pub mod compile;
pub mod items;
pub mod select;
pub mod types;

use crate::config::{self, CliOverrides, Settings};
use crate::error::{Result, WitError};
use crate::model::FieldValue;
use crate::storage::SqliteStorage;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Load settings for the current directory.
///
/// # Errors
///
/// Returns an error if a config file is unreadable or a value is invalid.
pub fn load_settings(cli: &CliOverrides) -> Result<Settings> {
    config::load_settings(Path::new("."), cli)
}

/// Open the configured store, creating its directory on first use.
///
/// # Errors
///
/// Returns an error if settings fail to load or the database cannot be opened.
pub fn open_storage(cli: &CliOverrides) -> Result<SqliteStorage> {
    let settings = load_settings(cli)?;
    if let Some(parent) = settings.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::open_with_timeout(&settings.db_path, settings.lock_timeout_ms)
}

pub(crate) fn parse_uuid(field: &str, input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim())
        .map_err(|e| WitError::validation(field, format!("not a valid id ({e}): {input}")))
}

/// Parse `--fields` JSON into field values.
pub(crate) fn parse_fields(input: &str) -> Result<BTreeMap<String, FieldValue>> {
    match serde_json::from_str::<Value>(input)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, value)| (name, FieldValue::from(value)))
            .collect()),
        other => Err(WitError::validation(
            "fields",
            format!("expected a JSON object, got {other}"),
        )),
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
