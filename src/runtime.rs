//! In-memory runtime state for each managed program.
//!
//! One [`ProgramRuntime`] exists per entry in the loaded configuration, at
//! the same index, for the lifetime of the process.

use std::fmt;

/// Lifecycle state of a managed program, as tracked by the supervisor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Never started, or stopped permanently (no further restart attempts).
    Stopped,
    /// Fork has been issued but the runtime slot has not yet been updated
    /// with the child's pid.
    Starting,
    /// The child is running; `pid > 0` holds iff the state is `Running`.
    Running,
    /// The child exited with status 0.
    Exited,
    /// The child exited with a non-zero status, or exited in a way that is
    /// neither a clean exit nor a signal kill.
    Failed,
    /// The child was terminated by a signal.
    Killed,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgramState::Stopped => "STOPPED",
            ProgramState::Starting => "STARTING",
            ProgramState::Running => "RUNNING",
            ProgramState::Exited => "EXITED",
            ProgramState::Failed => "FAILED",
            ProgramState::Killed => "KILLED",
        };
        f.write_str(s)
    }
}

/// Mutable state tracked per program across the life of the supervisor.
#[derive(Debug, Clone)]
pub struct ProgramRuntime {
    pub pid: Option<i32>,
    pub state: ProgramState,
    pub restart_count: u32,
}

impl ProgramRuntime {
    pub fn new() -> Self {
        Self {
            pid: None,
            state: ProgramState::Stopped,
            restart_count: 0,
        }
    }
}

impl Default for ProgramRuntime {
    fn default() -> Self {
        Self::new()
    }
}
