//! # Error Types
//!
//! Structured error types for cable_core. Most engine-level problems never
//! reach the caller: unparseable numbers degrade to neutral defaults and
//! table misses resolve to a factor of 1.0. The variants for those cases
//! still exist so the recovery sites can log a uniform, machine-readable
//! description of what was recovered.
//!
//! ## Example
//!
//! ```rust
//! use cable_core::errors::{CalcError, CalcResult};
//!
//! fn require_key(key: &str) -> CalcResult<()> {
//!     if key.trim().is_empty() {
//!         return Err(CalcError::missing_key("CalculationNumber"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_key("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for cable_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation and store operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Non-numeric text where a number was required
    #[error("Cannot parse '{value}' as a number for '{field}'")]
    Parse { field: String, value: String },

    /// The identifying key of a record is empty
    #[error("Missing required key: {field}")]
    MissingKey { field: String },

    /// A lookup table has no entry for the requested dimensions
    #[error("No entry in {table} for {key}")]
    LookupMiss { table: String, key: String },

    /// A derived field was written by a caller
    #[error("Field '{field}' is derived and cannot be edited")]
    ReadOnlyField { field: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML/CSV serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(field: impl Into<String>, value: impl Into<String>) -> Self {
        CalcError::Parse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a MissingKey error
    pub fn missing_key(field: impl Into<String>) -> Self {
        CalcError::MissingKey {
            field: field.into(),
        }
    }

    /// Create a LookupMiss error
    pub fn lookup_miss(table: impl Into<String>, key: impl Into<String>) -> Self {
        CalcError::LookupMiss {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a ReadOnlyField error
    pub fn read_only_field(field: impl Into<String>) -> Self {
        CalcError::ReadOnlyField {
            field: field.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        CalcError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CalcError::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::Parse { .. } => "PARSE_ERROR",
            CalcError::MissingKey { .. } => "MISSING_KEY",
            CalcError::LookupMiss { .. } => "LOOKUP_MISS",
            CalcError::ReadOnlyField { .. } => "READ_ONLY_FIELD",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
