//! # Scriptman Notify
//!
//! Lifecycle event notifications for the scriptman workspace.
//!
//! The manager emits a [`ScriptEvent`] after every start and terminal
//! transition; implementations of the [`Notifier`] trait deliver those
//! events to an external channel. Delivery is fire-and-forget from the
//! manager's point of view: a failed delivery is logged and swallowed,
//! never surfaced to the caller that triggered the transition.

pub mod event;
pub mod gateway;
pub mod telegram;

// Re-export main types
pub use event::{EventKind, ScriptEvent};
pub use gateway::{NullNotifier, Notifier};
pub use telegram::TelegramNotifier;
