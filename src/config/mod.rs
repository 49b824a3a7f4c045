//! Configuration management for `wit`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`WIT_*`)
//! 3. Project config (.wit/config.yaml)
//! 4. User config (~/.config/wit/config.yaml)
//! 5. Defaults

use crate::error::{Result, WitError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project directory holding the database and project config.
pub const PROJECT_DIR: &str = ".wit";
/// Default database filename inside the project directory.
const DEFAULT_DB_FILENAME: &str = "wit.db";
const ENV_PREFIX: &str = "WIT_";

const DB_KEY: &str = "db";
const LOCK_TIMEOUT_KEY: &str = "lock-timeout";
const QUALIFY_COLUMNS_KEY: &str = "qualify-columns";

/// One source of configuration as normalized key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs, keeping only `WIT_*` names.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub lock_timeout: Option<u64>,
    pub qualify_columns: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            layer.insert(DB_KEY, path.to_string_lossy());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            layer.insert(LOCK_TIMEOUT_KEY, lock_timeout.to_string());
        }
        if let Some(qualify) = self.qualify_columns {
            layer.insert(QUALIFY_COLUMNS_KEY, qualify.to_string());
        }

        layer
    }
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub lock_timeout_ms: Option<u64>,
    /// Qualify base columns with the table name when compiling filters.
    pub qualify_columns: bool,
}

impl Settings {
    /// Interpret a merged layer.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a value does not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let db_path = layer
            .get(DB_KEY)
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map_or_else(
                || Path::new(PROJECT_DIR).join(DEFAULT_DB_FILENAME),
                PathBuf::from,
            );

        let lock_timeout_ms = match layer.get(LOCK_TIMEOUT_KEY) {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                WitError::Config(format!(
                    "{LOCK_TIMEOUT_KEY} must be a number of milliseconds, got {value:?}"
                ))
            })?),
            None => None,
        };

        let qualify_columns = match layer.get(QUALIFY_COLUMNS_KEY) {
            Some(value) => parse_bool(value).ok_or_else(|| {
                WitError::Config(format!(
                    "{QUALIFY_COLUMNS_KEY} must be true or false, got {value:?}"
                ))
            })?,
            None => false,
        };

        Ok(Self {
            db_path,
            lock_timeout_ms,
            qualify_columns,
        })
    }
}

/// Load project config (.wit/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&project_root.join(PROJECT_DIR).join("config.yaml"))
}

/// Load user config (~/.config/wit/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("wit")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load configuration with the standard precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed, or a value
/// is invalid.
pub fn load_settings(project_root: &Path, cli: &CliOverrides) -> Result<Settings> {
    let user = load_user_config()?;
    let project = load_project_config(project_root)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    let merged = ConfigLayer::merge_layers(&[user, project, env_layer, cli_layer]);
    let settings = Settings::from_layer(&merged)?;
    tracing::debug!(db = %settings.db_path.display(), "Loaded settings");
    Ok(settings)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let serde_yaml::Value::Mapping(map) = value else {
        return layer;
    };
    for (key, value) in map {
        let (Some(key), Some(value)) = (key.as_str(), yaml_scalar_to_string(value)) else {
            continue;
        };
        layer.insert(key, value);
    }
    layer
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
