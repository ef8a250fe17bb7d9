//! # Error Types
//!
//! Structured error types for lcgen_core. Relationship and table errors carry
//! the action names involved so a caller can point the user at the offending
//! catalogue entry.
//!
//! ## Fatal vs recoverable
//!
//! - `UnknownReference`, `CyclicDependency`, `InvalidInput`, `DuplicateAction`
//!   abort a generation run; no container is returned.
//! - `MissingFactor` is recoverable: the generator skips the affected branch
//!   and reports the condition as a warning.
//! - `Parse` is fatal to a `serializer::read` call only.
//!
//! ## Example
//!
//! ```rust
//! use lcgen_core::errors::{CombError, CombResult};
//!
//! fn check_psi(value: f64) -> CombResult<()> {
//!     if !(0.0..=1.0).contains(&value) {
//!         return Err(CombError::invalid_input("psi0", value.to_string(), "must lie in [0, 1]"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_psi(0.7).is_ok());
//! assert_eq!(check_psi(1.2).unwrap_err().error_code(), "INVALID_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for lcgen_core operations
pub type CombResult<T> = Result<T, CombError>;

/// Structured error type for combination generation and file handling.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CombError {
    /// A declared relationship points to an action that is not in the catalogue
    #[error("Unknown reference: action '{action}' {relation} '{reference}', which does not exist")]
    UnknownReference {
        action: String,
        relation: String,
        reference: String,
    },

    /// `depends_on` edges form a cycle
    #[error("Cyclic dependency: '{action}' takes part in a depends_on cycle")]
    CyclicDependency { action: String },

    /// A required gamma/psi value is absent for an action/situation pair
    #[error("Missing factor for '{action}' in {situation}: {factor}")]
    MissingFactor {
        action: String,
        situation: String,
        factor: String,
    },

    /// Malformed serialized combinations
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// An input value is invalid (out of range, bad pattern, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Two actions share a name
    #[error("Duplicate action name: {name}")]
    DuplicateAction { name: String },

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

    /// JSON serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CombError {
    /// Create an UnknownReference error
    pub fn unknown_reference(
        action: impl Into<String>,
        relation: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        CombError::UnknownReference {
            action: action.into(),
            relation: relation.into(),
            reference: reference.into(),
        }
    }

    /// Create a CyclicDependency error
    pub fn cyclic_dependency(action: impl Into<String>) -> Self {
        CombError::CyclicDependency {
            action: action.into(),
        }
    }

    /// Create a MissingFactor error
    pub fn missing_factor(
        action: impl Into<String>,
        situation: impl Into<String>,
        factor: impl Into<String>,
    ) -> Self {
        CombError::MissingFactor {
            action: action.into(),
            situation: situation.into(),
            factor: factor.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(reason: impl Into<String>) -> Self {
        CombError::Parse {
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CombError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CombError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CombError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Whether the condition can be tolerated (branch skipped, lock retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CombError::MissingFactor { .. } | CombError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CombError::UnknownReference { .. } => "UNKNOWN_REFERENCE",
            CombError::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            CombError::MissingFactor { .. } => "MISSING_FACTOR",
            CombError::Parse { .. } => "PARSE_ERROR",
            CombError::InvalidInput { .. } => "INVALID_INPUT",
            CombError::DuplicateAction { .. } => "DUPLICATE_ACTION",
            CombError::FileError { .. } => "FILE_ERROR",
            CombError::FileLocked { .. } => "FILE_LOCKED",
            CombError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CombError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for CombError {
    fn from(e: serde_json::Error) -> Self {
        CombError::SerializationError { reason: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CombError::unknown_reference("Q1a", "depends on", "Q9");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"UnknownReference\""));
        let roundtrip: CombError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CombError::cyclic_dependency("A").error_code(), "CYCLIC_DEPENDENCY");
        assert_eq!(CombError::parse("bad").error_code(), "PARSE_ERROR");
        assert_eq!(
            CombError::missing_factor("W", "SLS-Frequent", "psi1").error_code(),
            "MISSING_FACTOR"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(CombError::missing_factor("W", "SLS-Rare", "psi0").is_recoverable());
        assert!(!CombError::cyclic_dependency("A").is_recoverable());
        assert!(!CombError::parse("x").is_recoverable());
    }

    #[test]
    fn test_display_mentions_names() {
        let error = CombError::unknown_reference("Q1a", "depends on", "Q9");
        let text = error.to_string();
        assert!(text.contains("Q1a"));
        assert!(text.contains("Q9"));
    }
}
