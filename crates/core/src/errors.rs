//! Error types for the merge-conflict core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

use crate::conflict::ConflictId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from the conflict scanning / resolution subsystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    /// The requested conflict is not part of this set.
    #[error("conflict not found: {0}")]
    NotFound(ConflictId),

    /// Attempted to resolve a conflict that is already resolved while the
    /// strict resolution policy is active.
    #[error("conflict {0} is already resolved")]
    AlreadyResolved(ConflictId),

    /// An operation that needs a chosen side ran on an unresolved conflict.
    #[error("conflict {0} has not been resolved")]
    NotResolved(ConflictId),

    /// Strict marker validation found unbalanced or nested markers.
    #[error("malformed conflict markers: {count} problem(s), first at row {first_row}")]
    MalformedMarkers { count: usize, first_row: usize },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ConflictError::AlreadyResolved(ConflictId(2));
        assert_eq!(err.to_string(), "conflict #2 is already resolved");

        let err = ConflictError::MalformedMarkers {
            count: 3,
            first_row: 14,
        };
        assert!(err.to_string().contains("first at row 14"));

        let err = ConfigError::InvalidValue {
            field: "resolution.policy".into(),
            detail: "unknown policy 'loose'".into(),
        };
        assert!(err.to_string().contains("resolution.policy"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = ConflictError::NotFound(ConflictId(0)).into();
        assert!(matches!(core_err, CoreError::Conflict(_)));

        let core_err: CoreError = ConfigError::ParseError("bad".into()).into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }
}
