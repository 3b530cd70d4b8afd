//! Child launcher: forks, establishes a new process group, redirects
//! stdio, and execs `/bin/sh -c <command>`.

use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::path::Path;

use nix::unistd::{execvp, fork, setpgid, ForkResult, Pid};

use crate::config::ProgramConfig;
use crate::errors::LaunchError;

fn redirect(stream: &'static str, path: &Path, target_fd: i32) -> Result<(), LaunchError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LaunchError::Redirect {
            stream,
            path: path.display().to_string(),
            source,
        })?;
    nix::unistd::dup2(file.as_raw_fd(), target_fd).map_err(|err| LaunchError::Redirect {
        stream,
        path: path.display().to_string(),
        source: std::io::Error::from_raw_os_error(err as i32),
    })?;
    Ok(())
}

/// Forks and execs `config.command` under `/bin/sh -c`. On success returns
/// the child's PID, which is also its process group ID — the child calls
/// `setpgid(0, 0)` before exec so the group leader equals the child PID.
///
/// The child never returns to the caller: on exec failure it calls
/// `process::exit(1)`.
pub fn launch(config: &ProgramConfig) -> Result<i32, LaunchError> {
    // SAFETY: this process is single-threaded between fork and exec in the
    // child, so only async-signal-safe calls are made before execvp.
    match unsafe { fork() }.map_err(LaunchError::Fork)? {
        ForkResult::Parent { child } => Ok(child.as_raw()),
        ForkResult::Child => {
            let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));

            // A redirection open failure is logged but not fatal — the
            // child proceeds on its inherited stream for that side.
            if let Some(path) = &config.stdout_path {
                if let Err(err) = redirect("stdout", path, libc_stdout_fd()) {
                    tracing::warn!(error = %err, "stdout redirection failed, using inherited stream");
                }
            }
            if let Some(path) = &config.stderr_path {
                if let Err(err) = redirect("stderr", path, libc_stderr_fd()) {
                    tracing::warn!(error = %err, "stderr redirection failed, using inherited stream");
                }
            }

            let shell = CString::new("/bin/sh").expect("no interior NUL");
            let arg0 = CString::new("sh").expect("no interior NUL");
            let flag = CString::new("-c").expect("no interior NUL");
            let command = CString::new(config.command.as_str()).unwrap_or_else(|_| {
                // a NUL in the command line can't be expressed as a shell
                // argument; fail the exec the same way the shell would.
                std::process::exit(1)
            });
            let args = [arg0, flag, command];

            let _ = execvp(&shell, &args);
            std::process::exit(1);
        }
    }
}

fn libc_stdout_fd() -> i32 {
    1
}

fn libc_stderr_fd() -> i32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutoRestart;
    use nix::sys::wait::{waitpid, WaitStatus};

    fn config_with_command(command: &str) -> ProgramConfig {
        ProgramConfig {
            name: "test".to_string(),
            command: command.to_string(),
            autostart: true,
            autorestart: AutoRestart::Never,
            restart_delay: 0,
            max_restarts: 0,
            memory_limit_bytes: 0,
            cpu_limit: 0.0,
            stdout_path: None,
            stderr_path: None,
        }
    }

    #[test]
    fn launches_and_exits_cleanly() {
        let config = config_with_command("exit 0");
        let pid = launch(&config).expect("launch should succeed");
        let status = waitpid(Pid::from_raw(pid), None).expect("waitpid should succeed");
        assert!(matches!(
            status,
            WaitStatus::Exited(_, 0)
        ));
    }

    #[test]
    fn nonzero_exit_is_reported() {
        let config = config_with_command("exit 7");
        let pid = launch(&config).expect("launch should succeed");
        let status = waitpid(Pid::from_raw(pid), None).expect("waitpid should succeed");
        assert!(matches!(status, WaitStatus::Exited(_, 7)));
    }

    #[test]
    fn child_becomes_its_own_process_group_leader() {
        let config = config_with_command("exit 0");
        let pid = launch(&config).expect("launch should succeed");
        let pgid = nix::unistd::getpgid(Some(Pid::from_raw(pid))).expect("getpgid");
        assert_eq!(pgid.as_raw(), pid);
        waitpid(Pid::from_raw(pid), None).ok();
    }

    #[test]
    fn redirect_open_failure_does_not_abort_the_child() {
        let mut config = config_with_command("exit 0");
        config.stdout_path = Some(std::path::PathBuf::from("/nonexistent-dir/out.log"));
        let pid = launch(&config).expect("launch should succeed");
        let status = waitpid(Pid::from_raw(pid), None).expect("waitpid should succeed");
        // the command still ran to completion on its inherited stdout,
        // rather than the launcher killing it over a bad redirect path.
        assert!(matches!(status, WaitStatus::Exited(_, 0)));
    }

    #[test]
    fn exec_failure_exits_with_status_one() {
        let config = config_with_command("\0bad");
        let pid = launch(&config).expect("launch should succeed");
        let status = waitpid(Pid::from_raw(pid), None).expect("waitpid should succeed");
        assert!(matches!(status, WaitStatus::Exited(_, 1)));
    }
}
