//! # Scriptman Common
//!
//! Shared types and error taxonomy for the scriptman workspace.
//!
//! This crate provides the foundational abstractions the other scriptman
//! crates build upon: the `ScriptError` taxonomy, the `ScriptResult` alias,
//! and the `ScriptDescriptor` identity type.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{ScriptError, ScriptResult};
pub use types::ScriptDescriptor;
