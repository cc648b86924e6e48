//! The notifier gateway trait and the no-op implementation.

use crate::event::ScriptEvent;
use async_trait::async_trait;
use scriptman_common::ScriptResult;

/// Abstract sink for lifecycle events.
///
/// Implementations deliver events to an external channel. Callers treat
/// delivery as fire-and-forget; a returned error is for logging only and
/// must never influence the state transition that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: ScriptEvent) -> ScriptResult<()>;
}

/// Notifier that drops every event. Used when notifications are disabled.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _event: ScriptEvent) -> ScriptResult<()> {
        Ok(())
    }
}
