//! Error types and error code constants for strata.
//!
//! This module provides a unified error type (`StrataError`) that bridges
//! domain-specific errors from the subsystems (input decoding, model
//! construction, metrics, persistence, configuration) into a common format
//! suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller, malformed unit documents)
//! - `3`: Resolution errors (unknown metric or entity, unsupported query)
//! - `4`: Persistence errors (metrics document unreadable or incompatible)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use strata_ast::AstError;
use thiserror::Error;

use crate::builder::BuildError;
use crate::config::ConfigError;
use crate::metrics::MetricError;
use crate::persist::PersistError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Lookup failures (unknown metric or entity, unsupported combination).
    ResolutionError = 3,
    /// Metrics document could not be written or read back.
    PersistenceError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Input path does not exist.
    #[error("input not found: {path}")]
    InputNotFound { path: String },

    /// Input exists but is not a valid compilation-unit document.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Metric query failed.
    #[error("metric error: {message}")]
    MetricError {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Metrics document could not be written or read.
    #[error("persistence error: {message}")]
    PersistenceError { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&StrataError> for OutputErrorCode {
    fn from(err: &StrataError) -> Self {
        match err {
            StrataError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            StrataError::InputNotFound { .. } => OutputErrorCode::ResolutionError,
            StrataError::InvalidInput { .. } => OutputErrorCode::InvalidArguments,
            StrataError::MetricError { .. } => OutputErrorCode::ResolutionError,
            StrataError::PersistenceError { .. } => OutputErrorCode::PersistenceError,
            StrataError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<AstError> for StrataError {
    fn from(err: AstError) -> Self {
        StrataError::InvalidInput {
            message: err.to_string(),
        }
    }
}

impl From<BuildError> for StrataError {
    fn from(err: BuildError) -> Self {
        StrataError::InternalError {
            message: err.to_string(),
        }
    }
}

impl From<MetricError> for StrataError {
    fn from(err: MetricError) -> Self {
        let details = serde_json::json!({ "reason": err.kind_name() });
        StrataError::MetricError {
            message: err.to_string(),
            details: Some(details),
        }
    }
}

impl From<PersistError> for StrataError {
    fn from(err: PersistError) -> Self {
        StrataError::PersistenceError {
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for StrataError {
    fn from(err: ConfigError) -> Self {
        StrataError::InvalidArguments {
            message: err.to_string(),
            details: None,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl StrataError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        StrataError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an input not found error.
    pub fn input_not_found(path: impl Into<String>) -> Self {
        StrataError::InputNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        StrataError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use crate::metrics::QueryMode;

    #[test]
    fn code_values_are_stable() {
        assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
        assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
        assert_eq!(OutputErrorCode::PersistenceError.code(), 4);
        assert_eq!(OutputErrorCode::InternalError.code(), 10);
        assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
    }

    #[test]
    fn unsupported_metric_maps_to_resolution_error() {
        let err: StrataError = MetricError::Unsupported {
            metric: "Depth of inheritance tree".to_string(),
            entity: "p.A".to_string(),
            kind: EntityKind::Class,
            mode: QueryMode::Total,
        }
        .into();
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        assert!(err.to_string().contains("p.A"));
    }

    #[test]
    fn input_not_found_display() {
        let err = StrataError::input_not_found("units/missing.json");
        assert_eq!(err.to_string(), "input not found: units/missing.json");
        assert_eq!(err.error_code().code(), 3);
    }

    #[test]
    fn persist_error_maps_to_persistence_code() {
        let err: StrataError = PersistError::SchemaMismatch {
            expected: 1,
            found: 9,
        }
        .into();
        assert_eq!(err.error_code(), OutputErrorCode::PersistenceError);
    }
}
