//! Core types for log capture

use serde::{Deserialize, Serialize};

/// Stream type (stdout or stderr)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Stdout => write!(f, "stdout"),
            StreamType::Stderr => write!(f, "stderr"),
        }
    }
}

/// An ordered view of buffered log lines plus the cursor a poller passes
/// back to receive only newer lines on its next read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSnapshot {
    /// Retained lines, oldest first
    pub lines: Vec<String>,
    /// Cursor positioned after the last line in `lines`
    pub next_cursor: u64,
}
