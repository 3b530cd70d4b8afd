//! Reaper and restart-policy engine.
//!
//! Drains all pending child-exit notifications in one non-blocking pass
//! (`waitpid(-1, WNOHANG)` in a loop, stopping on `WouldBlock`/`ECHILD`),
//! classifies each exit, and applies the restart-policy decision table.

use std::path::Path;
use std::thread;
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::cgroup::ProgramCgroup;
use crate::config::{AutoRestart, ProgramConfig};
use crate::launcher;
use crate::logsink::EventLog;
use crate::runtime::{ProgramRuntime, ProgramState};

/// How a reaped child terminated, independent of which program it belongs
/// to. Mirrors §4.3's three-way classification.
pub(crate) enum ExitKind {
    /// `WIFEXITED` — carries the exit code.
    Exited(i32),
    /// `WIFSIGNALED` — carries the killing signal.
    Signaled(Signal),
    /// Neither exited nor signaled (e.g. a stop/continue notification this
    /// supervisor never requested).
    Other,
}

impl ExitKind {
    /// The synthetic exit code recorded in events: the real code for a
    /// clean or failed exit, the negated signal number for a signal kill,
    /// or `-1` for anything else.
    fn code(&self) -> i32 {
        match self {
            ExitKind::Exited(code) => *code,
            ExitKind::Signaled(signal) => -(*signal as i32),
            ExitKind::Other => -1,
        }
    }

    fn state(&self) -> ProgramState {
        match self {
            ExitKind::Exited(0) => ProgramState::Exited,
            ExitKind::Exited(_) => ProgramState::Failed,
            ExitKind::Signaled(_) => ProgramState::Killed,
            ExitKind::Other => ProgramState::Failed,
        }
    }
}

/// Classifies one `waitpid` result, returning the pid it concerns and its
/// [`ExitKind`]. Returns `None` for `StillAlive` (no pid reaped) and for
/// any status with no associated pid.
pub(crate) fn classify(status: WaitStatus) -> Option<(Pid, ExitKind)> {
    match status {
        WaitStatus::Exited(pid, code) => Some((pid, ExitKind::Exited(code))),
        WaitStatus::Signaled(pid, signal, _) => Some((pid, ExitKind::Signaled(signal))),
        WaitStatus::StillAlive => None,
        other => other.pid().map(|pid| (pid, ExitKind::Other)),
    }
}

/// Records one classified exit to the event log under the program's name.
pub(crate) fn log_exit(log: &mut EventLog, name: &str, pid: i32, state: ProgramState, kind: &ExitKind) {
    match kind {
        ExitKind::Signaled(signal) => log.signaled(name, pid, state, *signal),
        _ => log.exited(name, pid, state, kind.code()),
    }
}

/// Whether an exited program should be relaunched, given its exit
/// classification and configured policy. `ALWAYS` restarts unconditionally,
/// including on a signal kill. `ON_FAILURE` restarts only on a non-zero
/// exit — a signal kill never triggers a restart under `ON_FAILURE`.
fn should_restart(policy: AutoRestart, kind: &ExitKind) -> bool {
    match policy {
        AutoRestart::Never => false,
        AutoRestart::Always => true,
        AutoRestart::OnFailure => matches!(kind, ExitKind::Exited(code) if *code != 0),
    }
}

/// Drains every pending `waitpid` notification and applies the restart
/// policy to each exited program. Programs under active shutdown (state
/// already [`ProgramState::Killed`]) are reaped but never restarted.
pub fn drain(
    configs: &[ProgramConfig],
    runtimes: &mut [ProgramRuntime],
    cgroup_root: &Path,
    log: &mut EventLog,
) {
    loop {
        let status = match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => status,
            Err(_) => break,
        };

        let Some((pid, kind)) = classify(status) else {
            break;
        };

        let Some(idx) = runtimes.iter().position(|rt| rt.pid == Some(pid.as_raw())) else {
            continue;
        };

        let config = &configs[idx];
        let new_state = kind.state();
        log_exit(log, &config.name, pid.as_raw(), new_state, &kind);

        let runtime = &mut runtimes[idx];
        runtime.pid = None;

        if runtime.state == ProgramState::Killed {
            continue;
        }

        runtime.state = new_state;

        if matches!(kind, ExitKind::Signaled(_)) {
            runtime.restart_count = 0;
        }

        if !should_restart(config.autorestart, &kind) {
            continue;
        }

        // Only ON_FAILURE is capped and counted; ALWAYS restarts
        // unconditionally and never touches `restart_count`.
        match config.autorestart {
            AutoRestart::OnFailure => {
                let under_cap =
                    config.max_restarts == 0 || runtime.restart_count < config.max_restarts;
                if under_cap {
                    runtime.restart_count += 1;
                    log.restarting_counted(&config.name, runtime.restart_count, config.max_restarts);
                    restart_one(config, runtime, cgroup_root, log);
                } else {
                    runtime.state = ProgramState::Stopped;
                    log.restart_limit_reached(&config.name, config.max_restarts);
                }
            }
            AutoRestart::Always => {
                log.restarting_plain(&config.name);
                restart_one(config, runtime, cgroup_root, log);
            }
            AutoRestart::Never => unreachable!("should_restart is false for Never"),
        }
    }
}

fn restart_one(
    config: &ProgramConfig,
    runtime: &mut ProgramRuntime,
    cgroup_root: &Path,
    log: &mut EventLog,
) {
    if config.restart_delay > 0 {
        thread::sleep(Duration::from_secs(config.restart_delay));
    }

    match launcher::launch(config) {
        Ok(pid) => {
            let cgroup = ProgramCgroup::new(cgroup_root, &config.name);
            if let Err(err) = cgroup.setup(config, pid) {
                tracing::warn!(program = %config.name, error = %err, "failed to apply resource limits");
            }
            runtime.pid = Some(pid);
            runtime.state = ProgramState::Running;
            log.spawned(&config.name, pid, runtime.state);
        }
        Err(err) => {
            tracing::warn!(program = %config.name, error = %err, "restart failed to launch");
            runtime.state = ProgramState::Stopped;
        }
    }
}
