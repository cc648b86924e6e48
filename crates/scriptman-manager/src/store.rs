//! Authoritative in-memory state for every known script.
//!
//! The store owns one [`ScriptRecord`] per script name. All reads hand out
//! value-copied snapshots so callers can never observe a record
//! mid-mutation; all writes go through [`RecordStore::update`], whose
//! closure runs under the store's write lock. Closures must stay cheap:
//! field writes and state transitions only. Spawning, signalling, and exit
//! waiting all happen outside the lock.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scriptman_common::{ScriptDescriptor, ScriptError, ScriptResult};
use scriptman_log_capture::LogRingBuffer;
use scriptman_state::{ScriptState, ScriptStateMachine};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Mutable runtime state for one script.
pub struct ScriptRecord {
    pub descriptor: ScriptDescriptor,
    pub machine: ScriptStateMachine,
    /// PID of the live native process. The `Child` handle itself is owned
    /// exclusively by the exit monitor task of the current run.
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    /// Set by `stop()` before the termination signal is sent; read by the
    /// exit monitor to classify the terminal transition
    pub stop_requested: bool,
    /// Captured output of the current (or last) run
    pub logs: Arc<LogRingBuffer>,
}

impl ScriptRecord {
    fn new(descriptor: ScriptDescriptor, log_capacity: usize) -> Self {
        let machine = ScriptStateMachine::new(&descriptor.name);
        Self {
            descriptor,
            machine,
            pid: None,
            started_at: None,
            ended_at: None,
            exit_code: None,
            stop_requested: false,
            logs: Arc::new(LogRingBuffer::new(log_capacity)),
        }
    }

    pub fn state(&self) -> ScriptState {
        self.machine.current_state()
    }

    /// Prepare the record for a fresh run: transition into `Starting` and
    /// clear the residue of the previous run.
    pub fn begin_start(&mut self) -> ScriptResult<()> {
        self.machine.transition_to_starting()?;
        self.pid = None;
        self.started_at = None;
        self.ended_at = None;
        self.exit_code = None;
        self.stop_requested = false;
        self.logs.reset();
        Ok(())
    }

    pub fn snapshot(&self) -> ScriptSnapshot {
        ScriptSnapshot {
            name: self.descriptor.name.clone(),
            path: self.descriptor.path.clone(),
            state: self.state(),
            pid: self.pid,
            started_at: self.started_at,
            ended_at: self.ended_at,
            exit_code: self.exit_code,
        }
    }
}

/// Immutable value copy of a record, safe to hand across task boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptSnapshot {
    pub name: String,
    pub path: PathBuf,
    pub state: ScriptState,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
}

/// Thread-safe store of script records, keyed by name.
pub struct RecordStore {
    records: RwLock<HashMap<String, ScriptRecord>>,
    log_capacity: usize,
}

impl RecordStore {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            log_capacity,
        }
    }

    /// Register a newly discovered script. Returns `false` when a record for
    /// the name already exists (existing runtime state is never clobbered).
    pub fn register(&self, descriptor: ScriptDescriptor) -> bool {
        let mut records = self.records.write();
        if records.contains_key(&descriptor.name) {
            return false;
        }
        info!("Registered script: {}", descriptor.name);
        records.insert(
            descriptor.name.clone(),
            ScriptRecord::new(descriptor, self.log_capacity),
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<ScriptSnapshot> {
        self.records.read().get(name).map(ScriptRecord::snapshot)
    }

    /// Snapshots of every record, name-sorted.
    pub fn list(&self) -> Vec<ScriptSnapshot> {
        let records = self.records.read();
        let mut snapshots: Vec<_> = records.values().map(ScriptRecord::snapshot).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn known_names(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Apply a mutation to one record atomically.
    ///
    /// Transitions gated through here are serialized per store: of two
    /// concurrent `start()` calls for the same name, exactly one closure
    /// observes a startable state.
    pub fn update<T>(
        &self,
        name: &str,
        mutator: impl FnOnce(&mut ScriptRecord) -> T,
    ) -> ScriptResult<T> {
        let mut records = self.records.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ScriptError::not_found(name))?;
        Ok(mutator(record))
    }

    /// Shared handle to a script's log buffer.
    pub fn logs_handle(&self, name: &str) -> ScriptResult<Arc<LogRingBuffer>> {
        self.records
            .read()
            .get(name)
            .map(|record| Arc::clone(&record.logs))
            .ok_or_else(|| ScriptError::not_found(name))
    }

    /// Remove a record, but only when no process is live or pending for it.
    /// A running script's record is never silently destroyed.
    pub fn remove_if_idle(&self, name: &str) -> bool {
        let mut records = self.records.write();
        match records.get(name) {
            Some(record) if record.state().is_terminal() => {
                records.remove(name);
                debug!("Removed record for vanished script: {}", name);
                true
            }
            _ => false,
        }
    }
}
