use chrono::{DateTime, Utc};
use scriptman_common::{ScriptError, ScriptResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a managed script process.
///
/// Exit classification policy: a script that exits on its own with code 0
/// lands in `Completed`; any other unrequested exit (nonzero code or signal)
/// lands in `Failed`; an exit following an explicit stop request lands in
/// `Stopped` when graceful (signal or code 0) and `Failed` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptState {
    /// No process exists and none has run since the script was discovered,
    /// or the last run was terminated by an explicit stop
    Stopped,
    /// A start was accepted and the spawn is in progress
    Starting,
    /// The process is alive and its output is being captured
    Running,
    /// A stop was requested and the process is being terminated
    Stopping,
    /// The process exited on its own with code 0
    Completed,
    /// The process failed to spawn, crashed, or exited abnormally
    Failed,
}

impl fmt::Display for ScriptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptState::Stopped => write!(f, "stopped"),
            ScriptState::Starting => write!(f, "starting"),
            ScriptState::Running => write!(f, "running"),
            ScriptState::Stopping => write!(f, "stopping"),
            ScriptState::Completed => write!(f, "completed"),
            ScriptState::Failed => write!(f, "failed"),
        }
    }
}

impl ScriptState {
    /// Check if the script is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScriptState::Stopped | ScriptState::Completed | ScriptState::Failed
        )
    }

    /// Check if the script is in a transitional state
    pub fn is_transitional(&self) -> bool {
        matches!(self, ScriptState::Starting | ScriptState::Stopping)
    }

    /// Check if the script has a live or pending native process
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// State machine that validates and records lifecycle transitions for one
/// script.
#[derive(Debug, Clone)]
pub struct ScriptStateMachine {
    script_name: String,
    current_state: ScriptState,
    previous_state: Option<ScriptState>,
    state_history: Vec<StateTransition>,
    last_transition_time: DateTime<Utc>,
}

/// A recorded state transition with timestamp and optional reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: ScriptState,
    pub to_state: ScriptState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

impl ScriptStateMachine {
    /// Create a new state machine for a script, starting in `Stopped`
    pub fn new(script_name: &str) -> Self {
        Self {
            script_name: script_name.to_string(),
            current_state: ScriptState::Stopped,
            previous_state: None,
            state_history: Vec::new(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn current_state(&self) -> ScriptState {
        self.current_state
    }

    pub fn previous_state(&self) -> Option<ScriptState> {
        self.previous_state
    }

    pub fn state_history(&self) -> &[StateTransition] {
        &self.state_history
    }

    pub fn last_transition_time(&self) -> DateTime<Utc> {
        self.last_transition_time
    }

    /// Check whether a transition from the current state to `target_state`
    /// is valid
    pub fn is_valid_transition(&self, target_state: ScriptState) -> bool {
        match (self.current_state, target_state) {
            // Terminal states re-enter Starting on an explicit start
            (ScriptState::Stopped, ScriptState::Starting) => true,
            (ScriptState::Completed, ScriptState::Starting) => true,
            (ScriptState::Failed, ScriptState::Starting) => true,

            // From Starting
            (ScriptState::Starting, ScriptState::Running) => true,
            (ScriptState::Starting, ScriptState::Failed) => true,

            // From Running
            (ScriptState::Running, ScriptState::Stopping) => true,
            (ScriptState::Running, ScriptState::Completed) => true,
            (ScriptState::Running, ScriptState::Failed) => true,

            // From Stopping
            (ScriptState::Stopping, ScriptState::Stopped) => true,
            (ScriptState::Stopping, ScriptState::Failed) => true,

            // Same state (no-op)
            (state, target) if state == target => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Transition to a new state with an optional reason
    pub fn transition_to(
        &mut self,
        target_state: ScriptState,
        reason: Option<String>,
    ) -> ScriptResult<()> {
        if !self.is_valid_transition(target_state) {
            return Err(ScriptError::invalid_state(
                &self.script_name,
                format!("{:?}", target_state),
                format!("{:?}", self.current_state),
            ));
        }

        let now = Utc::now();
        let transition = StateTransition {
            from_state: self.current_state,
            to_state: target_state,
            timestamp: now,
            reason,
        };

        self.previous_state = Some(self.current_state);
        self.current_state = target_state;
        self.last_transition_time = now;
        self.state_history.push(transition);

        // Limit history size to prevent unbounded growth
        if self.state_history.len() > 100 {
            self.state_history.remove(0);
        }

        tracing::debug!(
            "Script {} transitioned from {:?} to {:?}",
            self.script_name,
            self.previous_state.unwrap(),
            self.current_state
        );

        Ok(())
    }

    /// Convenience methods for specific transitions
    pub fn transition_to_starting(&mut self) -> ScriptResult<()> {
        self.transition_to(ScriptState::Starting, Some("Start requested".to_string()))
    }

    pub fn transition_to_running(&mut self) -> ScriptResult<()> {
        self.transition_to(ScriptState::Running, Some("Process spawned".to_string()))
    }

    pub fn transition_to_stopping(&mut self) -> ScriptResult<()> {
        self.transition_to(ScriptState::Stopping, Some("Stop requested".to_string()))
    }

    pub fn transition_to_stopped(&mut self, reason: String) -> ScriptResult<()> {
        self.transition_to(ScriptState::Stopped, Some(reason))
    }

    pub fn transition_to_completed(&mut self) -> ScriptResult<()> {
        self.transition_to(
            ScriptState::Completed,
            Some("Process exited successfully".to_string()),
        )
    }

    pub fn transition_to_failed(&mut self, reason: String) -> ScriptResult<()> {
        self.transition_to(ScriptState::Failed, Some(reason))
    }

    /// Check if the script can be started
    pub fn can_start(&self) -> bool {
        self.current_state.is_terminal()
    }

    /// Check if the script can be stopped
    pub fn can_stop(&self) -> bool {
        matches!(self.current_state, ScriptState::Running)
    }

    /// Get the most recent transition
    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.state_history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_creation() {
        let sm = ScriptStateMachine::new("counter");
        assert_eq!(sm.current_state(), ScriptState::Stopped);
        assert_eq!(sm.previous_state(), None);
        assert_eq!(sm.state_history().len(), 0);
    }

    #[test]
    fn test_full_run_lifecycle() {
        let mut sm = ScriptStateMachine::new("counter");

        assert!(sm.transition_to_starting().is_ok());
        assert_eq!(sm.current_state(), ScriptState::Starting);

        assert!(sm.transition_to_running().is_ok());
        assert_eq!(sm.current_state(), ScriptState::Running);

        assert!(sm.transition_to_stopping().is_ok());
        assert_eq!(sm.current_state(), ScriptState::Stopping);

        assert!(sm.transition_to_stopped("SIGTERM delivered".to_string()).is_ok());
        assert_eq!(sm.current_state(), ScriptState::Stopped);
    }

    #[test]
    fn test_natural_completion() {
        let mut sm = ScriptStateMachine::new("counter");
        sm.transition_to_starting().unwrap();
        sm.transition_to_running().unwrap();
        sm.transition_to_completed().unwrap();
        assert_eq!(sm.current_state(), ScriptState::Completed);

        // Completed is re-enterable
        assert!(sm.transition_to_starting().is_ok());
    }

    #[test]
    fn test_spawn_failure_path() {
        let mut sm = ScriptStateMachine::new("ghost");
        sm.transition_to_starting().unwrap();
        sm.transition_to_failed("interpreter not found".to_string())
            .unwrap();
        assert_eq!(sm.current_state(), ScriptState::Failed);
        assert!(sm.can_start());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = ScriptStateMachine::new("counter");

        // Stopped -> Running (invalid, must go through Starting)
        assert!(!sm.is_valid_transition(ScriptState::Running));
        assert!(sm.transition_to(ScriptState::Running, None).is_err());

        // Stopped -> Stopping (invalid)
        assert!(!sm.is_valid_transition(ScriptState::Stopping));

        // Completed -> Stopping (invalid)
        sm.transition_to_starting().unwrap();
        sm.transition_to_running().unwrap();
        sm.transition_to_completed().unwrap();
        assert!(!sm.is_valid_transition(ScriptState::Stopping));
    }

    #[test]
    fn test_state_properties() {
        assert!(ScriptState::Stopped.is_terminal());
        assert!(ScriptState::Completed.is_terminal());
        assert!(ScriptState::Failed.is_terminal());

        assert!(ScriptState::Starting.is_transitional());
        assert!(ScriptState::Stopping.is_transitional());

        assert!(ScriptState::Running.is_active());
        assert!(ScriptState::Starting.is_active());
        assert!(!ScriptState::Completed.is_active());
    }

    #[test]
    fn test_can_operations() {
        let mut sm = ScriptStateMachine::new("counter");

        assert!(sm.can_start());
        assert!(!sm.can_stop());

        sm.transition_to_starting().unwrap();
        assert!(!sm.can_start());
        assert!(!sm.can_stop());

        sm.transition_to_running().unwrap();
        assert!(!sm.can_start());
        assert!(sm.can_stop());
    }

    #[test]
    fn test_state_history() {
        let mut sm = ScriptStateMachine::new("counter");

        sm.transition_to_starting().unwrap();
        sm.transition_to_running().unwrap();
        sm.transition_to_completed().unwrap();

        assert_eq!(sm.state_history().len(), 3);
        assert_eq!(sm.state_history()[0].from_state, ScriptState::Stopped);
        assert_eq!(sm.state_history()[0].to_state, ScriptState::Starting);
        assert_eq!(
            sm.last_transition().unwrap().to_state,
            ScriptState::Completed
        );
    }
}
