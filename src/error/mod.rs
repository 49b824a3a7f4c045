//! Error types and handling for `wit_core`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Type-validation, schema-compatibility and compilation failures are
//!   ordinary values returned to the caller, never panics
//! - Compilation errors are accumulated by the compiler and surface here
//!   as a single `Compile` variant carrying the whole list
//! - Provides structured JSON output for the CLI

mod structured;

pub use structured::{ErrorCode, StructuredError};

use crate::model::Kind;
use crate::query::CompileError;
use thiserror::Error;

/// Primary error type for `wit_core` operations.
#[derive(Error, Debug)]
pub enum WitError {
    // === Type-validation Errors ===
    /// A value's dynamic shape does not match the declared kind.
    #[error("value {value} should be {expected}, but is {found}")]
    TypeMismatch {
        value: String,
        expected: String,
        found: String,
    },

    /// A required field was absent, null or blank.
    #[error("value for field {field} must not be {problem}")]
    RequiredField { field: String, problem: String },

    /// Value is not one of the enum's allowed values.
    #[error("value {value} is not part of allowed enum values: {allowed}")]
    NotInEnum { value: String, allowed: String },

    /// A list element failed component-type conversion.
    #[error("error converting list value at position {index}: {source}")]
    ListElement {
        index: usize,
        #[source]
        source: Box<WitError>,
    },

    /// A named field's value failed conversion.
    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<WitError>,
    },

    /// A field type definition is malformed.
    #[error("Invalid field type: {reason}")]
    InvalidFieldType { reason: String },

    /// A value could not be moved from one field type to another.
    #[error("cannot convert value from {from} to {to}: {reason}")]
    TypeConversion { from: Kind, to: Kind, reason: String },

    /// Unknown kind name.
    #[error("Unknown field kind: {kind}")]
    UnknownKind { kind: String },

    // === Schema-compatibility Errors ===
    /// A new field definition does not enclose the old one.
    #[error("Incompatible definition for field {field}: {reason}")]
    Incompatible { field: String, reason: String },

    // === Compilation Errors ===
    /// The criteria expression did not compile.
    #[error("Query compilation failed: {}", join_errors(.errors))]
    Compile { errors: Vec<CompileError> },

    /// The JSON filter could not be turned into an expression.
    #[error("Invalid filter: {reason}")]
    Filter { reason: String },

    // === Storage Errors ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Work item type with the given ID or name was not found.
    #[error("Work item type not found: {id}")]
    TypeNotFound { id: String },

    /// A work item type with the same name already exists.
    #[error("Work item type already exists: {name}")]
    DuplicateType { name: String },

    /// Work item with the given ID was not found.
    #[error("Work item not found: {id}")]
    WorkItemNotFound { id: String },

    /// The stored row changed since it was read.
    #[error("Version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict { id: String, expected: i64, found: i64 },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl WitError {
    /// Is this a problem with the submitted data rather than the system?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::RequiredField { .. }
                | Self::NotInEnum { .. }
                | Self::ListElement { .. }
                | Self::Field { .. }
                | Self::InvalidFieldType { .. }
                | Self::TypeConversion { .. }
                | Self::UnknownKind { .. }
                | Self::Incompatible { .. }
                | Self::Compile { .. }
                | Self::Filter { .. }
                | Self::TypeNotFound { .. }
                | Self::DuplicateType { .. }
                | Self::WorkItemNotFound { .. }
                | Self::VersionConflict { .. }
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Field { source, .. } => source.suggestion(),
            Self::TypeNotFound { .. } => Some("Run: wit type list"),
            Self::NotInEnum { .. } => Some("Use one of the values listed in the type definition"),
            Self::Incompatible { .. } => {
                Some("Keep every existing field; enum types may only gain values")
            }
            Self::VersionConflict { .. } => Some("Reload the work item and retry"),
            Self::Compile { .. } => Some("Field names must not contain quotes"),
            Self::DuplicateType { .. } => Some("Choose another name or update the existing type"),
            _ => None,
        }
    }

    /// Create a type mismatch error from a value description.
    #[must_use]
    pub fn mismatch(
        value: impl std::fmt::Display,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            value: value.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Attach a field name to a conversion error.
    #[must_use]
    pub fn in_field(self, field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid field type error.
    #[must_use]
    pub fn invalid_type(reason: impl Into<String>) -> Self {
        Self::InvalidFieldType {
            reason: reason.into(),
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `WitError`.
pub type Result<T> = std::result::Result<T, WitError>;
