//! Public facade over discovery, the record store, and the runner.

use crate::config::ManagerConfig;
use crate::discovery::discover_scripts;
use crate::runner::ScriptRunner;
use crate::store::{RecordStore, ScriptSnapshot};
use scriptman_common::{ScriptError, ScriptResult};
use scriptman_notify::{NullNotifier, Notifier, TelegramNotifier};
use scriptman_state::ScriptState;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Log lines plus the cursor for the next incremental read.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptLogs {
    pub lines: Vec<String>,
    pub next_cursor: u64,
    pub state: ScriptState,
}

/// The script process manager.
///
/// Owns the record store and the runner; every public operation resolves to
/// store reads and runner calls. Instances are self-contained; tests run
/// several isolated managers side by side.
pub struct ScriptManager {
    store: Arc<RecordStore>,
    runner: ScriptRunner,
    scripts_dir: PathBuf,
}

impl ScriptManager {
    /// Create a manager with an explicit notifier gateway.
    pub fn new(config: &ManagerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(RecordStore::new(config.scripts.max_log_lines));
        let runner = ScriptRunner::new(
            Arc::clone(&store),
            notifier,
            &config.scripts,
            CancellationToken::new(),
        );

        Self {
            store,
            runner,
            scripts_dir: PathBuf::from(&config.scripts.directory),
        }
    }

    /// Create a manager with the notifier the configuration asks for:
    /// Telegram when credentials are present and notifications are enabled,
    /// a no-op sink otherwise.
    pub fn from_config(config: &ManagerConfig) -> Self {
        let notifier: Arc<dyn Notifier> = match (
            config.notifications.enabled,
            config.notifications.telegram.as_ref(),
        ) {
            (true, Some(telegram)) => {
                info!("Telegram notifications enabled");
                Arc::new(TelegramNotifier::new(
                    telegram.bot_token.clone(),
                    telegram.chat_id.clone(),
                ))
            }
            _ => {
                info!("Notifications disabled");
                Arc::new(NullNotifier)
            }
        };

        Self::new(config, notifier)
    }

    /// Merge the scripts discovered on disk with current record state and
    /// return a name-sorted snapshot list.
    pub async fn list_scripts(&self) -> ScriptResult<Vec<ScriptSnapshot>> {
        self.refresh().await?;
        Ok(self.store.list())
    }

    /// Start a script by name. Unknown names trigger one rescan of the
    /// scripts directory before reporting `NotFound`.
    pub async fn start(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        if !self.store.contains(name) {
            self.refresh().await?;
        }
        if !self.store.contains(name) {
            return Err(ScriptError::not_found(name));
        }

        self.runner.start(name).await
    }

    /// Stop a script by name.
    pub async fn stop(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        self.runner.stop(name).await
    }

    /// Current snapshot of one script's record.
    pub fn status(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        self.store
            .get(name)
            .ok_or_else(|| ScriptError::not_found(name))
    }

    /// Captured log lines for a script.
    ///
    /// With a cursor, only lines appended since that cursor are returned;
    /// without one, the full retained buffer. Either way the response
    /// carries the cursor to pass on the next poll.
    pub fn logs(&self, name: &str, cursor: Option<u64>) -> ScriptResult<ScriptLogs> {
        let buffer = self.store.logs_handle(name)?;
        let snapshot = match cursor {
            Some(cursor) => buffer.snapshot_since(cursor),
            None => buffer.snapshot(),
        };
        let state = self
            .store
            .get(name)
            .ok_or_else(|| ScriptError::not_found(name))?
            .state;

        Ok(ScriptLogs {
            lines: snapshot.lines,
            next_cursor: snapshot.next_cursor,
            state,
        })
    }

    /// Stop all running scripts and cancel capture tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down script manager");
        self.runner.shutdown().await;
        info!("Script manager shut down");
    }

    /// Sync the record store with the scripts directory: register newly
    /// discovered scripts, prune records whose file is gone, but never
    /// while a process is live or pending for them.
    async fn refresh(&self) -> ScriptResult<()> {
        let discovered = discover_scripts(&self.scripts_dir).await?;
        let on_disk: HashSet<&str> = discovered.iter().map(|d| d.name.as_str()).collect();

        for name in self.store.known_names() {
            if !on_disk.contains(name.as_str()) && !self.store.remove_if_idle(&name) {
                // File vanished while a process is live or pending; the
                // record stays until the run reaches a terminal state
                debug!("Script file for {} vanished while active, keeping record", name);
            }
        }

        for descriptor in discovered {
            self.store.register(descriptor);
        }

        Ok(())
    }
}
