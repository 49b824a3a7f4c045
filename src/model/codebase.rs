use crate::error::{Result, WitError};
use crate::model::value::whole_number;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const REPOSITORY_KEY: &str = "repository";
pub const BRANCH_KEY: &str = "branch";
pub const FILE_NAME_KEY: &str = "filename";
pub const LINE_NUMBER_KEY: &str = "linenumber";
pub const CODEBASE_ID_KEY: &str = "codebaseid";

static GIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:git|ssh|https?|git@[-\w.]+):(//)?(.+?)(\.git)?(/?|#[-\w.]+)$")
        .expect("git url pattern compiles")
});

/// Pointer into a source repository, as stored on a codebase field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodebaseContent {
    pub repository: String,
    pub branch: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<i64>,
    pub codebase_id: Option<String>,
}

impl CodebaseContent {
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file_name: impl Into<String>, line_number: i64) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }

    /// Check that the repository reference is present and looks like a git URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending part.
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(WitError::validation(REPOSITORY_KEY, "repository is mandatory"));
        }
        if !GIT_URL.is_match(self.repository.trim()) {
            return Err(WitError::validation(
                REPOSITORY_KEY,
                format!("invalid repository URL: {}", self.repository),
            ));
        }
        if let Some(line) = self.line_number {
            if line < 0 {
                return Err(WitError::validation(LINE_NUMBER_KEY, "must not be negative"));
            }
        }
        Ok(())
    }

    /// Rebuild from the stored key/value map.
    ///
    /// # Errors
    ///
    /// Returns an error if a key holds a value of the wrong shape.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let repository = optional_string(map, REPOSITORY_KEY)?.unwrap_or_default();
        let line_number = match map.get(LINE_NUMBER_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(
                whole_number(n).ok_or_else(|| WitError::mismatch(n, "integer", "float"))?,
            ),
            Some(other) => return Err(WitError::mismatch(other, "integer", "non-number")),
        };
        Ok(Self {
            repository,
            branch: optional_string(map, BRANCH_KEY)?,
            file_name: optional_string(map, FILE_NAME_KEY)?,
            line_number,
            codebase_id: optional_string(map, CODEBASE_ID_KEY)?,
        })
    }

    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            REPOSITORY_KEY.to_string(),
            Value::String(self.repository.clone()),
        );
        if let Some(branch) = &self.branch {
            map.insert(BRANCH_KEY.to_string(), Value::String(branch.clone()));
        }
        if let Some(file_name) = &self.file_name {
            map.insert(FILE_NAME_KEY.to_string(), Value::String(file_name.clone()));
        }
        if let Some(line) = self.line_number {
            map.insert(LINE_NUMBER_KEY.to_string(), Value::from(line));
        }
        if let Some(id) = &self.codebase_id {
            map.insert(CODEBASE_ID_KEY.to_string(), Value::String(id.clone()));
        }
        map
    }
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(WitError::validation(
            key,
            format!("expected a string, got {other}"),
        )),
    }
}
