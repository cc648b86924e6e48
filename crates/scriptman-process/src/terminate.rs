//! Process termination primitives.

use scriptman_common::ScriptResult;

/// Terminate a process gracefully (SIGTERM).
#[cfg(unix)]
pub fn terminate_gracefully(pid: u32) -> ScriptResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);
    kill(nix_pid, Signal::SIGTERM)
        .map_err(|e| scriptman_common::ScriptError::stop_failed(pid.to_string(), e.to_string()))
}

/// Force kill a process (SIGKILL).
#[cfg(unix)]
pub fn force_kill(pid: u32) -> ScriptResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);
    kill(nix_pid, Signal::SIGKILL)
        .map_err(|e| scriptman_common::ScriptError::stop_failed(pid.to_string(), e.to_string()))
}

#[cfg(not(unix))]
pub fn terminate_gracefully(pid: u32) -> ScriptResult<()> {
    Err(scriptman_common::ScriptError::stop_failed(
        pid.to_string(),
        "signal delivery is only supported on Unix platforms",
    ))
}

#[cfg(not(unix))]
pub fn force_kill(pid: u32) -> ScriptResult<()> {
    Err(scriptman_common::ScriptError::stop_failed(
        pid.to_string(),
        "signal delivery is only supported on Unix platforms",
    ))
}
