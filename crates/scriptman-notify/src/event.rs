//! Lifecycle event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of lifecycle transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Started,
    Completed,
    Failed,
    Stopped,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Started => write!(f, "started"),
            EventKind::Completed => write!(f, "completed"),
            EventKind::Failed => write!(f, "failed"),
            EventKind::Stopped => write!(f, "stopped"),
        }
    }
}

/// A lifecycle notification emitted by the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub script: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Exit code, when the process produced one
    pub exit_code: Option<i32>,
    /// Free-form context: spawn error text, or the tail of captured output
    /// for failures
    pub message: Option<String>,
}

impl ScriptEvent {
    pub fn new(script: impl Into<String>, kind: EventKind) -> Self {
        Self {
            script: script.into(),
            kind,
            timestamp: Utc::now(),
            exit_code: None,
            message: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
