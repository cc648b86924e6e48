//! Script runner: spawn, output capture wiring, exit observation, stop
//! orchestration.
//!
//! One runner serves every script; per-run resources (the `Child` handle,
//! the two capture tasks) are owned by tasks the runner spawns. Transition
//! races are decided inside [`RecordStore::update`] closures: whichever
//! caller observes a startable/stoppable state performs the transition, and
//! it alone proceeds to spawn or signal. No lock is held across spawn,
//! signal delivery, draining, or exit waiting.

use crate::config::ScriptsConfig;
use crate::store::{RecordStore, ScriptSnapshot};
use chrono::Utc;
use scriptman_common::{ScriptError, ScriptResult};
use scriptman_log_capture::{capture_stream, StreamType};
use scriptman_notify::{EventKind, Notifier, ScriptEvent};
use scriptman_state::ScriptState;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Window after the graceful timeout in which a force-killed process must
/// be observed exiting
const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(3);

/// Poll interval while waiting for the exit monitor to record a terminal
/// transition
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Bound on waiting for capture tasks to finish after process exit
const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of log lines attached to failure notifications
const FAILURE_TAIL_LINES: usize = 20;

/// Drives the lifecycle of individual script processes.
#[derive(Clone)]
pub struct ScriptRunner {
    store: Arc<RecordStore>,
    notifier: Arc<dyn Notifier>,
    interpreter: String,
    scripts_dir: PathBuf,
    environment: HashMap<String, String>,
    graceful_timeout: Duration,
    cancel: CancellationToken,
}

/// Decision taken under the store lock when a start is requested
enum StartGate {
    /// A process is already live or pending; report the current state
    AlreadyActive(ScriptSnapshot),
    /// This caller won the transition into `Starting` and must spawn
    Spawn { path: PathBuf },
}

/// Decision taken under the store lock when a stop is requested
enum StopGate {
    /// Nothing to signal: terminal, still spawning, or already stopping
    NoOp(ScriptSnapshot),
    /// This caller won the transition into `Stopping` and must signal
    Signal { pid: Option<u32> },
}

/// How the native process ended, as observed by the exit monitor
enum ExitOutcome {
    Exited(Option<i32>),
    WaitError(String),
}

impl ScriptRunner {
    pub fn new(
        store: Arc<RecordStore>,
        notifier: Arc<dyn Notifier>,
        scripts: &ScriptsConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            notifier,
            interpreter: scripts.interpreter.clone(),
            scripts_dir: PathBuf::from(&scripts.directory),
            environment: scripts.environment.clone(),
            graceful_timeout: scripts.graceful_timeout,
            cancel,
        }
    }

    /// Start the script's process.
    ///
    /// A start on a script that is already `Starting`/`Running`/`Stopping`
    /// is a no-op reporting the current state. A spawn failure is captured
    /// into the `Failed` state and returned as a snapshot, not as an error.
    pub async fn start(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        let gate = self
            .store
            .update(name, |record| -> ScriptResult<StartGate> {
                if record.state().is_active() {
                    return Ok(StartGate::AlreadyActive(record.snapshot()));
                }
                record.begin_start()?;
                Ok(StartGate::Spawn {
                    path: record.descriptor.path.clone(),
                })
            })
            .and_then(|gate| gate)?;

        let path = match gate {
            StartGate::AlreadyActive(snapshot) => {
                debug!(
                    "Start requested for {} while {}, reporting current state",
                    name, snapshot.state
                );
                return Ok(snapshot);
            }
            StartGate::Spawn { path } => path,
        };

        self.spawn(name, path).await
    }

    async fn spawn(&self, name: &str, path: PathBuf) -> ScriptResult<ScriptSnapshot> {
        info!("Spawning script: {} ({})", name, path.display());

        let mut cmd = scriptman_process::build_script_command(
            &self.interpreter,
            &path,
            &self.scripts_dir,
            &self.environment,
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = format!("Failed to spawn process: {}", e);
                error!("Script {} failed to start: {}", name, reason);
                let snapshot = self
                    .store
                    .update(name, |record| {
                        let result = record.machine.transition_to_failed(reason.clone());
                        record.ended_at = Some(Utc::now());
                        (record.snapshot(), result)
                    })
                    .map(|(snapshot, result)| {
                        if let Err(e) = result {
                            error!("Failed-state transition rejected for {}: {}", name, e);
                        }
                        snapshot
                    })?;
                self.emit(
                    ScriptEvent::new(name, EventKind::Failed).with_message(reason),
                );
                return Ok(snapshot);
            }
        };

        let pid = child.id();
        let logs = self.store.logs_handle(name)?;
        let capture_tasks = self.spawn_capture_tasks(name, &mut child, &logs);

        let snapshot = self
            .store
            .update(name, |record| -> ScriptResult<ScriptSnapshot> {
                record.machine.transition_to_running()?;
                record.pid = pid;
                record.started_at = Some(Utc::now());
                Ok(record.snapshot())
            })
            .and_then(|snapshot| snapshot)?;

        info!("Script started: {} (PID: {:?})", name, pid);
        self.emit(ScriptEvent::new(name, EventKind::Started));

        let runner = self.clone();
        let script_name = name.to_string();
        tokio::spawn(async move {
            runner.monitor_exit(script_name, child, capture_tasks).await;
        });

        Ok(snapshot)
    }

    /// Spawn one capture task per stdio stream. Both tasks append into the
    /// script's ring buffer and end on stream EOF or cancellation.
    fn spawn_capture_tasks(
        &self,
        name: &str,
        child: &mut Child,
        logs: &Arc<scriptman_log_capture::LogRingBuffer>,
    ) -> Vec<JoinHandle<u64>> {
        let mut tasks = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            tasks.push(tokio::spawn(capture_stream(
                stdout,
                StreamType::Stdout,
                name.to_string(),
                Arc::clone(logs),
                self.cancel.child_token(),
            )));
        } else {
            warn!("No stdout pipe available for {}", name);
        }

        if let Some(stderr) = child.stderr.take() {
            tasks.push(tokio::spawn(capture_stream(
                stderr,
                StreamType::Stderr,
                name.to_string(),
                Arc::clone(logs),
                self.cancel.child_token(),
            )));
        } else {
            warn!("No stderr pipe available for {}", name);
        }

        tasks
    }

    /// Own the child for the rest of its life: wait for exit, join the
    /// capture tasks, record exactly one terminal transition, and emit the
    /// terminal event.
    ///
    /// Exit detection is independent of output draining: a script that
    /// closes its streams early is not mistaken for having exited, and a
    /// flooding script cannot delay exit-code recording beyond the bounded
    /// drain join below.
    async fn monitor_exit(
        self,
        name: String,
        mut child: Child,
        capture_tasks: Vec<JoinHandle<u64>>,
    ) {
        let outcome = match child.wait().await {
            Ok(status) => ExitOutcome::Exited(status.code()),
            Err(e) => {
                error!("Failed to wait for script {}: {}", name, e);
                ExitOutcome::WaitError(e.to_string())
            }
        };

        // Join both capture tasks before the record goes terminal so a
        // reader that observes a terminal state sees the complete output.
        for task in capture_tasks {
            if timeout(DRAIN_JOIN_TIMEOUT, task).await.is_err() {
                warn!(
                    "Capture task for {} did not finish within {:?}",
                    name, DRAIN_JOIN_TIMEOUT
                );
            }
        }

        let update = self.store.update(&name, |record| {
            let stop_requested = record.stop_requested;
            let (kind, exit_code, transition) = match &outcome {
                ExitOutcome::Exited(code) => {
                    Self::classify_exit(&name, stop_requested, *code, record)
                }
                ExitOutcome::WaitError(reason) => (
                    EventKind::Failed,
                    None,
                    record
                        .machine
                        .transition_to_failed(format!("Failed to observe exit: {}", reason)),
                ),
            };

            if let Err(e) = transition {
                // A second terminal transition for the same run would be a
                // lifecycle bug; surface it loudly instead of masking it.
                error!("Terminal transition rejected for {}: {}", name, e);
            }

            record.pid = None;
            record.exit_code = exit_code;
            record.ended_at = Some(Utc::now());
            (kind, exit_code)
        });

        let (kind, exit_code) = match update {
            Ok(result) => result,
            Err(e) => {
                // Record vanished while a process was live; nothing to update
                error!("Exit observed for unknown script {}: {}", name, e);
                return;
            }
        };

        info!(
            "Script {} finished: {} (exit code: {:?})",
            name, kind, exit_code
        );

        let mut event = ScriptEvent::new(&name, kind).with_exit_code(exit_code);
        if kind == EventKind::Failed {
            if let Ok(logs) = self.store.logs_handle(&name) {
                let tail = logs.tail(FAILURE_TAIL_LINES);
                if !tail.is_empty() {
                    event = event.with_message(tail.join("\n"));
                }
            }
        }
        self.emit(event);
    }

    /// Classify a process exit into a terminal state.
    ///
    /// Policy: a self-exit with code 0 is `Completed`; any other
    /// unrequested exit is `Failed`; an exit after a stop request is
    /// `Stopped` when graceful (signal or code 0) and `Failed` otherwise.
    fn classify_exit(
        name: &str,
        stop_requested: bool,
        code: Option<i32>,
        record: &mut crate::store::ScriptRecord,
    ) -> (EventKind, Option<i32>, ScriptResult<()>) {
        if stop_requested {
            match code {
                Some(c) if c != 0 => (
                    EventKind::Failed,
                    code,
                    record
                        .machine
                        .transition_to_failed(format!("Exited with code {} during stop", c)),
                ),
                _ => (
                    EventKind::Stopped,
                    code,
                    record
                        .machine
                        .transition_to_stopped("Terminated on request".to_string()),
                ),
            }
        } else {
            match code {
                Some(0) => (
                    EventKind::Completed,
                    code,
                    record.machine.transition_to_completed(),
                ),
                Some(c) => (
                    EventKind::Failed,
                    code,
                    record
                        .machine
                        .transition_to_failed(format!("Exited with code {}", c)),
                ),
                None => {
                    debug!("Script {} terminated by a signal without a stop request", name);
                    (
                        EventKind::Failed,
                        None,
                        record
                            .machine
                            .transition_to_failed("Terminated by signal".to_string()),
                    )
                }
            }
        }
    }

    /// Stop the script's process: graceful signal, bounded grace period,
    /// then forced kill.
    ///
    /// A stop on a script without a running process is a no-op reporting the
    /// current state. A start cannot be cancelled mid-spawn; stopping a
    /// `Starting` script reports its state and the caller retries once it is
    /// `Running`.
    pub async fn stop(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        let gate = self
            .store
            .update(name, |record| -> ScriptResult<StopGate> {
                if !record.machine.can_stop() {
                    return Ok(StopGate::NoOp(record.snapshot()));
                }
                record.machine.transition_to_stopping()?;
                record.stop_requested = true;
                Ok(StopGate::Signal { pid: record.pid })
            })
            .and_then(|gate| gate)?;

        let pid = match gate {
            StopGate::NoOp(snapshot) => {
                debug!(
                    "Stop requested for {} while {}, reporting current state",
                    name, snapshot.state
                );
                return Ok(snapshot);
            }
            StopGate::Signal { pid } => pid,
        };

        if let Some(pid) = pid {
            info!("Sending termination signal to {} (PID: {})", name, pid);
            if let Err(e) = scriptman_process::terminate_gracefully(pid) {
                // The process may have exited between the gate and the
                // signal; the exit monitor records the outcome either way.
                debug!("Failed to send SIGTERM to PID {}: {}", pid, e);
            }
        }

        if self.wait_for_terminal(name, self.graceful_timeout).await? {
            info!("Script terminated gracefully: {}", name);
            return self.snapshot_of(name);
        }

        warn!(
            "Graceful shutdown timed out for {} (PID: {:?}), attempting force kill",
            name, pid
        );

        if let Some(pid) = pid {
            if let Err(e) = scriptman_process::force_kill(pid) {
                error!("Force kill failed for {} (PID: {}): {}", name, pid, e);
            }
        }

        if self.wait_for_terminal(name, FORCE_KILL_TIMEOUT).await? {
            info!("Script terminated after force kill: {}", name);
            return self.snapshot_of(name);
        }

        Err(ScriptError::timeout(name, "stop"))
    }

    /// Poll the record until the exit monitor writes a terminal state.
    /// Returns `Ok(false)` when the timeout elapses first.
    async fn wait_for_terminal(&self, name: &str, wait: Duration) -> ScriptResult<bool> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let snapshot = self
                .store
                .get(name)
                .ok_or_else(|| ScriptError::not_found(name))?;
            if snapshot.state.is_terminal() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    fn snapshot_of(&self, name: &str) -> ScriptResult<ScriptSnapshot> {
        self.store
            .get(name)
            .ok_or_else(|| ScriptError::not_found(name))
    }

    /// Stop every script with a live process and cancel the capture tasks.
    pub async fn shutdown(&self) {
        let active: Vec<String> = self
            .store
            .list()
            .into_iter()
            .filter(|snapshot| matches!(snapshot.state, ScriptState::Running))
            .map(|snapshot| snapshot.name)
            .collect();

        if !active.is_empty() {
            info!("Stopping {} running script(s)", active.len());
        }

        for name in active {
            if let Err(e) = self.stop(&name).await {
                warn!("Failed to stop {} during shutdown: {}", name, e);
            }
        }

        self.cancel.cancel();
    }

    /// Deliver a lifecycle event without letting transport failures touch
    /// the state machine.
    fn emit(&self, event: ScriptEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let script = event.script.clone();
            let kind = event.kind;
            if let Err(e) = notifier.notify(event).await {
                warn!(
                    "Failed to deliver {} notification for {}: {}",
                    kind, script, e
                );
            }
        });
    }
}
