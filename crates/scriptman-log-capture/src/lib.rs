//! # Scriptman Log Capture
//!
//! Per-script output capture for the scriptman workspace.
//!
//! This crate provides:
//! - A bounded, FIFO-evicting ring buffer for captured log lines
//! - Cursor-based incremental snapshots for polling readers
//! - Async line-by-line draining of child process stdio streams

pub mod buffer;
pub mod capture;
pub mod types;

// Re-export main types
pub use buffer::LogRingBuffer;
pub use capture::capture_stream;
pub use types::{LogSnapshot, StreamType};
