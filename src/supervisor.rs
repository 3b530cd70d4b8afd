//! The supervisor loop: installs the SIGINT/SIGTERM handler, autostarts
//! every configured program, then alternates reaping and sleeping until a
//! shutdown signal arrives.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, SigHandler, Signal};

use crate::cgroup::{ProgramCgroup, DEFAULT_CGROUP_ROOT};
use crate::config::ProgramConfig;
use crate::launcher;
use crate::logsink::EventLog;
use crate::reap;
use crate::runtime::{ProgramRuntime, ProgramState};
use crate::shutdown;

/// Set to `true` by the signal handler. This is the only state the handler
/// touches — a plain relaxed store is async-signal-safe; anything more
/// (allocation, locking, I/O) is not.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: i32) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Interval of the main poll loop.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn install_signal_handlers() {
    let handler = SigHandler::Handler(request_shutdown);
    // SAFETY: `request_shutdown` only performs a relaxed atomic store,
    // which is async-signal-safe.
    unsafe {
        let _ = signal::sigaction(
            Signal::SIGINT,
            &nix::sys::signal::SigAction::new(handler, nix::sys::signal::SaFlags::empty(), nix::sys::signal::SigSet::empty()),
        );
        let _ = signal::sigaction(
            Signal::SIGTERM,
            &nix::sys::signal::SigAction::new(handler, nix::sys::signal::SaFlags::empty(), nix::sys::signal::SigSet::empty()),
        );
    }
}

/// Owns the loaded configuration, per-program runtime state, and the event
/// sink for one run of the supervisor.
pub struct Supervisor {
    configs: Vec<ProgramConfig>,
    runtimes: Vec<ProgramRuntime>,
    cgroup_root: PathBuf,
    log: EventLog,
}

impl Supervisor {
    pub fn new(configs: Vec<ProgramConfig>, log_path: &Path) -> Self {
        let runtimes = configs.iter().map(|_| ProgramRuntime::new()).collect();
        Self {
            configs,
            runtimes,
            cgroup_root: PathBuf::from(DEFAULT_CGROUP_ROOT),
            log: EventLog::open(log_path),
        }
    }

    #[cfg(test)]
    pub fn with_cgroup_root(mut self, root: &Path) -> Self {
        self.cgroup_root = root.to_path_buf();
        self
    }

    fn autostart(&mut self) {
        for idx in 0..self.configs.len() {
            if !self.configs[idx].autostart {
                continue;
            }
            self.start(idx);
        }
    }

    fn start(&mut self, idx: usize) {
        let config = &self.configs[idx];
        match launcher::launch(config) {
            Ok(pid) => {
                let cgroup = ProgramCgroup::new(&self.cgroup_root, &config.name);
                if let Err(err) = cgroup.setup(config, pid) {
                    tracing::warn!(program = %config.name, error = %err, "failed to apply resource limits");
                }
                self.runtimes[idx].pid = Some(pid);
                self.runtimes[idx].state = ProgramState::Running;
                self.log.spawned(&config.name, pid, ProgramState::Running);
            }
            Err(err) => {
                // Fork failure leaves the program in whatever stopped-variant
                // state it already held; it never moves to Exited/Failed,
                // which are reserved for a child that actually ran.
                tracing::error!(program = %config.name, error = %err, "failed to launch");
            }
        }
    }

    /// Runs the supervisor until a shutdown signal is observed, then drives
    /// the shutdown coordinator to completion before returning.
    pub fn run(&mut self) {
        install_signal_handlers();
        self.runtimes.iter_mut().for_each(|rt| *rt = ProgramRuntime::new());
        self.autostart();

        while !SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
            reap::drain(&self.configs, &mut self.runtimes, &self.cgroup_root, &mut self.log);
            thread::sleep(POLL_INTERVAL);
        }

        shutdown::shutdown_all(&self.configs, &mut self.runtimes, &self.cgroup_root, &mut self.log);
    }
}
