//! # Error Types
//!
//! Structured error types for span_core. Each variant carries enough context
//! for a human (or a build script) to locate the offending table branch or
//! file without re-running anything.
//!
//! Validation findings are *not* errors: they are collected in a
//! [`ValidationReport`](crate::validation::ValidationReport) and only become
//! a [`SpanError::ValidationFailed`] when a caller asks for it.
//!
//! ## Example
//!
//! ```rust
//! use span_core::errors::{SpanError, SpanResult};
//!
//! fn check_span(span_m: f64) -> SpanResult<()> {
//!     if span_m <= 0.0 {
//!         return Err(SpanError::invalid_input("max_span", span_m.to_string(), "Span must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_span(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for span_core operations
pub type SpanResult<T> = Result<T, SpanError>;

/// Structured error type for span table operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum SpanError {
    /// A derivation was requested but no eligible source value exists
    #[error("Missing reference for {element} {grade} {size} @ {condition}: {needed}")]
    MissingReference {
        element: String,
        grade: String,
        size: String,
        condition: String,
        needed: String,
    },

    /// An input value is invalid (out of range, malformed key, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A grade, size, spacing or element name that is not known
    #[error("Unknown {kind}: {key}")]
    UnknownKey { kind: String, key: String },

    /// A database failed validation and must not be shipped
    #[error("Validation failed with {error_count} error(s): {first_error}")]
    ValidationFailed {
        error_count: usize,
        first_error: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Rule table / configuration could not be parsed or is inconsistent
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },
}

impl SpanError {
    /// Create a MissingReference error
    pub fn missing_reference(
        element: impl Into<String>,
        grade: impl Into<String>,
        size: impl Into<String>,
        condition: impl Into<String>,
        needed: impl Into<String>,
    ) -> Self {
        SpanError::MissingReference {
            element: element.into(),
            grade: grade.into(),
            size: size.into(),
            condition: condition.into(),
            needed: needed.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownKey error
    pub fn unknown_key(kind: impl Into<String>, key: impl Into<String>) -> Self {
        SpanError::UnknownKey {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        SpanError::SerializationError { reason: reason.into() }
    }

    /// Create a ConfigError
    pub fn config(reason: impl Into<String>) -> Self {
        SpanError::ConfigError { reason: reason.into() }
    }

    /// Data-completeness errors that a caller may skip while continuing
    /// with the rest of the database.
    pub fn is_branch_local(&self) -> bool {
        matches!(self, SpanError::MissingReference { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            SpanError::MissingReference { .. } => "MISSING_REFERENCE",
            SpanError::InvalidInput { .. } => "INVALID_INPUT",
            SpanError::UnknownKey { .. } => "UNKNOWN_KEY",
            SpanError::ValidationFailed { .. } => "VALIDATION_FAILED",
            SpanError::FileError { .. } => "FILE_ERROR",
            SpanError::SerializationError { .. } => "SERIALIZATION_ERROR",
            SpanError::VersionMismatch { .. } => "VERSION_MISMATCH",
            SpanError::ConfigError { .. } => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = SpanError::missing_reference("roof_rafters", "C30", "47x150", "400mm", "C16 or C24");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"MissingReference\""));
        let roundtrip: SpanError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_missing_reference_message_names_branch() {
        let error = SpanError::missing_reference("floor_joists", "C30", "47x100", "400mm", "C16 or C24");
        let message = error.to_string();
        assert!(message.contains("floor_joists"));
        assert!(message.contains("C30"));
        assert!(message.contains("47x100"));
        assert!(message.contains("400mm"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SpanError::unknown_key("grade", "C40").error_code(), "UNKNOWN_KEY");
        assert_eq!(SpanError::config("bad ratio").error_code(), "CONFIG_ERROR");
        assert!(SpanError::missing_reference("a", "b", "c", "d", "e").is_branch_local());
        assert!(!SpanError::serialization("x").is_branch_local());
    }
}
