//! Process existence checking.

use scriptman_common::ScriptResult;

/// Check if a process with the given PID exists and is running.
///
/// Performs a non-destructive check: on Unix, `kill(pid, 0)` sends no signal
/// but reports whether the process exists.
///
/// # Returns
///
/// * `Ok(true)` - Process exists and is running
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - Error occurred while checking
pub fn process_exists(pid: u32) -> ScriptResult<bool> {
    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(not(unix))]
    {
        Err(scriptman_common::ScriptError::configuration(
            pid.to_string(),
            "process existence checks are only supported on Unix platforms",
        ))
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> ScriptResult<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);

    match kill(nix_pid, None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Process exists but we don't have permission to signal it
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(scriptman_common::ScriptError::configuration(
            pid.to_string(),
            format!("Failed to check process: {}", e),
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_exists() {
        let pid = std::process::id();
        assert!(process_exists(pid).unwrap());
    }

    #[test]
    fn test_unlikely_pid_does_not_exist() {
        assert!(!process_exists(4_000_000).unwrap());
    }
}
