//! Error types for the shift engine
//!
//! All errors are designed to be operator-facing with clear messages and
//! remediation hints.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ShiftError>;

/// Comprehensive error type for shift runs
#[derive(Error, Debug)]
pub enum ShiftError {
    /// Shift definition or invocation is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Declared transaction mode string is not one of single/per_record/none
    #[error("Invalid transaction mode: '{0}'. Expected one of 'single', 'per_record', 'none'.")]
    InvalidTransactionMode(String),

    /// Resume was requested against a collection that has no stable ordering key
    #[error("Cannot resume an in-memory collection: resumption requires a streaming collection ordered by a stable key. Re-run without --continue-from.")]
    ResumeUnsupported,

    /// An outbound call was attempted during a dry run to a host outside the allow-list
    #[error("External request to '{host}' is not allowed during a dry run. Declare the host via allow_external_requests in the shift definition (or SHIFT_ALLOWED_HOSTS), or guard the call with ctx.dry_run().")]
    ExternalRequestBlocked { host: String },

    /// One or more records errored during the run
    #[error("{0} record(s) failed")]
    RecordsFailed(usize),

    /// `find_exactly` could not locate every requested id
    #[error("Couldn't find all {kind} records with ids: {}", .missing.join(", "))]
    MissingRecords { kind: String, missing: Vec<String> },

    /// Operator interrupted the run; any open transaction was rolled back
    #[error("Run interrupted by operator")]
    Interrupted,

    /// Datastore operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Outbound HTTP request failed (network-level, not guard-blocked)
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// File system operation failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShiftError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the error classes that abort before any record is processed
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidTransactionMode(_) | Self::ResumeUnsupported
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_records_failed_message() {
        let err = ShiftError::RecordsFailed(3);
        assert_eq!(err.to_string(), "3 record(s) failed");
    }

    #[test]
    fn test_blocked_request_names_host() {
        let err = ShiftError::ExternalRequestBlocked {
            host: "api.example.com".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("api.example.com"));
        assert!(msg.contains("allow_external_requests"));
    }

    #[test]
    fn test_missing_records_enumerates_ids() {
        let err = ShiftError::MissingRecords {
            kind: "user".to_string(),
            missing: vec!["7".to_string(), "9".to_string()],
        };
        assert!(err.to_string().contains("7, 9"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(ShiftError::ResumeUnsupported.is_configuration());
        assert!(ShiftError::InvalidTransactionMode("x".into()).is_configuration());
        assert!(!ShiftError::RecordsFailed(1).is_configuration());
    }
}
