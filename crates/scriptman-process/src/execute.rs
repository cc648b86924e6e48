//! Script command construction.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Build the command that runs a script through its interpreter.
///
/// The child inherits the manager's environment plus the configured
/// overrides, runs with the scripts directory as its working directory, and
/// has stdout/stderr piped for capture. Stdin is closed so a script that
/// reads from it sees EOF instead of blocking forever.
pub fn build_script_command(
    interpreter: &str,
    script_path: &Path,
    working_dir: &Path,
    environment: &HashMap<String, String>,
) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.arg(script_path)
        .current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());

    for (key, value) in environment {
        cmd.env(key, value);
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_script_command_shape() {
        let env = HashMap::from([("TOKEN".to_string(), "abc".to_string())]);
        let cmd = build_script_command(
            "python3",
            Path::new("/srv/scripts/counter.py"),
            Path::new("/srv/scripts"),
            &env,
        );

        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "python3");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, vec![Path::new("/srv/scripts/counter.py").as_os_str()]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/srv/scripts")));
    }
}
