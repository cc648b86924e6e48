//! Error types for script process management.

use thiserror::Error;

/// Result type alias for script operations.
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Error taxonomy for script process management.
///
/// Expected failure modes of the lifecycle itself (spawn errors, abnormal
/// exits) are captured into the record's `Failed` state rather than raised
/// through the facade; these variants cover the cases that do cross API
/// boundaries.
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    #[error("Script not found: {name}")]
    NotFound { name: String },

    #[error("Script spawn failed: {name} - {reason}")]
    SpawnFailed { name: String, reason: String },

    #[error("Script stop failed: {name} - {reason}")]
    StopFailed { name: String, reason: String },

    #[error("Script operation timed out: {name} - {operation}")]
    Timeout { name: String, operation: String },

    #[error("Script state error: {name} - expected {expected}, got {actual}")]
    InvalidState {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Script configuration error: {name} - {reason}")]
    Configuration { name: String, reason: String },

    #[error("Notification delivery failed: {reason}")]
    NotifyFailed { reason: String },

    #[error("Script discovery error: {reason}")]
    Discovery { reason: String },
}

impl ScriptError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn spawn_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            name: name.into(),
            operation: operation.into(),
        }
    }

    pub fn invalid_state(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn configuration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn notify_failed(reason: impl Into<String>) -> Self {
        Self::NotifyFailed {
            reason: reason.into(),
        }
    }

    pub fn discovery(reason: impl Into<String>) -> Self {
        Self::Discovery {
            reason: reason.into(),
        }
    }
}
