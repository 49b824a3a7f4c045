//! Structured error output for the CLI.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::WitError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Storage Errors (exit code 2) ===
    /// Database operation failed
    DatabaseError,
    /// Optimistic version check failed
    VersionConflict,

    // === Lookup Errors (exit code 3) ===
    /// Work item type not found
    TypeNotFound,
    /// Work item not found
    WorkItemNotFound,
    /// Work item type name already taken
    DuplicateType,

    // === Validation Errors (exit code 4) ===
    /// Value does not fit the field type
    TypeMismatch,
    /// Required field missing or blank
    RequiredField,
    /// Value outside the enum's allowed set
    NotInEnum,
    /// Field type definition invalid
    InvalidFieldType,
    /// Generic field validation failure
    ValidationFailed,

    // === Schema Errors (exit code 5) ===
    /// New definition does not enclose the old one
    IncompatibleSchema,
    /// Value could not be moved to another type
    ConversionFailed,

    // === Query Errors (exit code 6) ===
    /// Criteria expression did not compile
    CompileFailed,
    /// JSON filter malformed
    InvalidFilter,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::TypeNotFound => "TYPE_NOT_FOUND",
            Self::WorkItemNotFound => "WORK_ITEM_NOT_FOUND",
            Self::DuplicateType => "DUPLICATE_TYPE",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::NotInEnum => "NOT_IN_ENUM",
            Self::InvalidFieldType => "INVALID_FIELD_TYPE",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::IncompatibleSchema => "INCOMPATIBLE_SCHEMA",
            Self::ConversionFailed => "CONVERSION_FAILED",
            Self::CompileFailed => "COMPILE_FAILED",
            Self::InvalidFilter => "INVALID_FILTER",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether fixing the input and retrying can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict
                | Self::TypeMismatch
                | Self::RequiredField
                | Self::NotInEnum
                | Self::ValidationFailed
                | Self::CompileFailed
                | Self::InvalidFilter
        )
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseError | Self::VersionConflict => 2,
            Self::TypeNotFound | Self::WorkItemNotFound | Self::DuplicateType => 3,
            Self::TypeMismatch
            | Self::RequiredField
            | Self::NotInEnum
            | Self::InvalidFieldType
            | Self::ValidationFailed => 4,
            Self::IncompatibleSchema | Self::ConversionFailed => 5,
            Self::CompileFailed | Self::InvalidFilter => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `WitError`.
    #[must_use]
    pub fn from_error(err: &WitError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(ToString::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Convert to JSON value for output.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &WitError) -> (ErrorCode, Option<Value>) {
        match err {
            WitError::Database(_) => (ErrorCode::DatabaseError, None),
            WitError::VersionConflict {
                id,
                expected,
                found,
            } => (
                ErrorCode::VersionConflict,
                Some(json!({"id": id, "expected": expected, "found": found})),
            ),
            WitError::TypeNotFound { id } => (ErrorCode::TypeNotFound, Some(json!({"id": id}))),
            WitError::WorkItemNotFound { id } => {
                (ErrorCode::WorkItemNotFound, Some(json!({"id": id})))
            }
            WitError::DuplicateType { name } => {
                (ErrorCode::DuplicateType, Some(json!({"name": name})))
            }
            WitError::TypeMismatch {
                expected, found, ..
            } => (
                ErrorCode::TypeMismatch,
                Some(json!({"expected": expected, "found": found})),
            ),
            WitError::ListElement { index, .. } => {
                (ErrorCode::TypeMismatch, Some(json!({"position": index})))
            }
            WitError::Field { field, source } => {
                let (code, _) = Self::extract_code_and_context(source);
                (code, Some(json!({"field": field})))
            }
            WitError::RequiredField { field, .. } => {
                (ErrorCode::RequiredField, Some(json!({"field": field})))
            }
            WitError::NotInEnum { allowed, .. } => {
                (ErrorCode::NotInEnum, Some(json!({"allowed": allowed})))
            }
            WitError::InvalidFieldType { .. } | WitError::UnknownKind { .. } => {
                (ErrorCode::InvalidFieldType, None)
            }
            WitError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            WitError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors.iter()
                        .map(|e| json!({"field": e.field, "message": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            WitError::Incompatible { field, .. } => {
                (ErrorCode::IncompatibleSchema, Some(json!({"field": field})))
            }
            WitError::TypeConversion { from, to, .. } => (
                ErrorCode::ConversionFailed,
                Some(json!({"from": from.as_str(), "to": to.as_str()})),
            ),
            WitError::Compile { errors } => (
                ErrorCode::CompileFailed,
                Some(json!({
                    "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>()
                })),
            ),
            WitError::Filter { .. } => (ErrorCode::InvalidFilter, None),
            WitError::Config(_) => (ErrorCode::ConfigError, None),
            WitError::Io(_) => (ErrorCode::IoError, None),
            WitError::Json(_) => (ErrorCode::JsonError, None),
            WitError::Yaml(_) => (ErrorCode::YamlError, None),
            WitError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CompileError;

    #[test]
    fn compile_errors_carry_every_message() {
        let err = WitError::Compile {
            errors: vec![
                CompileError::QuoteInFieldName {
                    field: "x'".to_string(),
                },
                CompileError::NoHierarchy {
                    field: "system_labels".to_string(),
                },
            ],
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::CompileFailed);
        assert_eq!(structured.code.exit_code(), 6);
        let errors = structured.context.unwrap()["errors"].as_array().unwrap().len();
        assert_eq!(errors, 2);
    }

    #[test]
    fn human_output_includes_hint() {
        let err = WitError::TypeNotFound {
            id: "bug".to_string(),
        };
        let text = StructuredError::from_error(&err).to_human(false);
        assert!(text.starts_with("Error: Work item type not found: bug"));
        assert!(text.contains("Hint: Run: wit type list"));
    }

    #[test]
    fn json_output_shape() {
        let err = WitError::Config("bad timeout".to_string());
        let json = StructuredError::from_error(&err).to_json();
        assert_eq!(json["error"]["code"], "CONFIG_ERROR");
        assert_eq!(json["error"]["retryable"], false);
    }
}
