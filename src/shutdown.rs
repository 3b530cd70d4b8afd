//! Shutdown coordinator: brings every running program down in four phases
//! — signal SIGTERM to each process group, wait up to a grace period while
//! still reaping exits, SIGKILL whatever remains, then tear down cgroups.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag};
use nix::unistd::Pid;

use crate::cgroup::ProgramCgroup;
use crate::config::ProgramConfig;
use crate::logsink::EventLog;
use crate::reap::{classify, log_exit};
use crate::runtime::{ProgramRuntime, ProgramState};

/// Default grace period, per §4.4's `timeout_sec`.
const GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Poll interval while waiting out the grace period.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn send_to_group(pid: i32, signal: Signal) {
    // Negative PID targets the whole process group, which the child
    // joined via `setpgid(0, 0)` at launch.
    let _ = signal::kill(Pid::from_raw(-pid), signal);
}

/// Runs all four shutdown phases to completion against every still-running
/// program, then cleans up each program's cgroup directory.
pub fn shutdown_all(
    configs: &[ProgramConfig],
    runtimes: &mut [ProgramRuntime],
    cgroup_root: &Path,
    log: &mut EventLog,
) {
    log.shutdown_initiated();

    // Phase 1: signal every running group.
    for (idx, runtime) in runtimes.iter().enumerate() {
        if let Some(pid) = runtime.pid {
            if runtime.state == ProgramState::Running {
                send_to_group(pid, Signal::SIGTERM);
                log.sent_term(&configs[idx].name, pid);
            }
        }
    }

    // Phase 2: wait out the grace period, reaping and classifying exactly
    // like the normal reaper (but never applying a restart policy). Every
    // matched pid is removed from `remaining` exactly once, so a single
    // reap can never be double-counted against the grace budget.
    let mut remaining: Vec<usize> = runtimes
        .iter()
        .enumerate()
        .filter(|(_, rt)| rt.pid.is_some())
        .map(|(idx, _)| idx)
        .collect();

    let deadline = Instant::now() + GRACE_PERIOD;
    while !remaining.is_empty() && Instant::now() < deadline {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => match classify(status) {
                Some((pid, kind)) => {
                    let Some(pos) = remaining.iter().position(|&idx| runtimes[idx].pid == Some(pid.as_raw())) else {
                        continue;
                    };
                    let idx = remaining.remove(pos);
                    let new_state = kind.state();
                    log_exit(log, &configs[idx].name, pid.as_raw(), new_state, &kind);
                    runtimes[idx].pid = None;
                    runtimes[idx].state = new_state;
                }
                None => thread::sleep(POLL_INTERVAL),
            },
            Err(_) => thread::sleep(POLL_INTERVAL),
        }
    }

    if !remaining.is_empty() {
        log.grace_elapsed();
    }

    // Phase 3: force-kill anything still alive.
    for &idx in &remaining {
        if let Some(pid) = runtimes[idx].pid {
            runtimes[idx].state = ProgramState::Killed;
            send_to_group(pid, Signal::SIGKILL);
            log.forced_kill(&configs[idx].name, pid);
            let _ = waitpid(Pid::from_raw(pid), None);
            runtimes[idx].pid = None;
        }
    }

    // Phase 4: tear down cgroups for every program, regardless of how it
    // exited.
    for config in configs {
        let cgroup = ProgramCgroup::new(cgroup_root, &config.name);
        if let Err(err) = cgroup.cleanup() {
            tracing::warn!(program = %config.name, error = %err, "failed to remove cgroup");
        }
    }

    log.shutdown_complete();
}
