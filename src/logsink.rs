//! Event log sink: an append-only, line-flushed record of supervisor
//! decisions (spawn, exit, restart, kill), independent of `tracing`
//! diagnostics. Rotates the previous file aside once it reaches 5MiB, as
//! measured when the sink is opened.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use nix::sys::signal::Signal;

use crate::runtime::ProgramState;

/// Rotation threshold, checked once at open time.
const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;

enum Sink {
    File(File),
    Stdout(io::Stdout),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::File(f) => f.write(buf),
            Sink::Stdout(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File(f) => f.flush(),
            Sink::Stdout(s) => s.flush(),
        }
    }
}

/// Where supervisor events are recorded.
pub struct EventLog {
    sink: Sink,
}

impl EventLog {
    /// Opens (and rotates, if needed) the log file at `path`. Falls back to
    /// stdout if the file cannot be opened, logging the failure via
    /// `tracing` rather than aborting startup over a logging problem.
    pub fn open(path: &Path) -> Self {
        if let Ok(metadata) = fs::metadata(path) {
            if metadata.len() >= ROTATE_AT_BYTES {
                let rotated = rotated_name(path);
                if let Err(err) = fs::rename(path, &rotated) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to rotate event log");
                }
            }
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self { sink: Sink::File(file) },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to open event log, falling back to stdout");
                Self { sink: Sink::Stdout(io::stdout()) }
            }
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.sink, "[{timestamp}] {line}")?;
        self.sink.flush()
    }

    pub fn spawned(&mut self, name: &str, pid: i32, state: ProgramState) {
        self.emit(&format!("Spawned {name} (PID {pid}, state={state})"));
    }

    pub fn exited(&mut self, name: &str, pid: i32, state: ProgramState, code: i32) {
        self.emit(&format!("{name} (PID {pid}, state={state}) exited with {code}"));
    }

    pub fn signaled(&mut self, name: &str, pid: i32, state: ProgramState, signal: Signal) {
        self.emit(&format!("{name} (PID {pid}, state={state}) killed by {signal}"));
    }

    /// An ON_FAILURE restart: always shows the attempt against the cap.
    pub fn restarting_counted(&mut self, name: &str, attempt: u32, max_restarts: u32) {
        self.emit(&format!("Restarting {name} ({attempt}/{max_restarts})"));
    }

    /// An ALWAYS restart: uncounted, since that policy has no cap.
    pub fn restarting_plain(&mut self, name: &str) {
        self.emit(&format!("Restarting {name}"));
    }

    pub fn restart_limit_reached(&mut self, name: &str, max_restarts: u32) {
        self.emit(&format!(
            "{name} reached max restarts ({max_restarts}), not restarting"
        ));
    }

    pub fn shutdown_initiated(&mut self) {
        self.emit("Shutdown initiated");
    }

    pub fn sent_term(&mut self, name: &str, pid: i32) {
        self.emit(&format!("Sent TERM to {name} group {pid}"));
    }

    pub fn grace_elapsed(&mut self) {
        self.emit("Grace period elapsed, escalating");
    }

    pub fn forced_kill(&mut self, name: &str, pid: i32) {
        self.emit(&format!("Forced kill of {name} (PID {pid})"));
    }

    pub fn shutdown_complete(&mut self) {
        self.emit("Shutdown complete");
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = self.write_line(line) {
            tracing::warn!(error = %err, "failed to write event log line");
        }
    }
}

/// `<stem>-YYYYMMDD-HHMMSS.<ext>` in the same directory as `path`, using the
/// local rotation time — e.g. `supervisor.log` rotates to
/// `supervisor-20260726-153000.log`.
fn rotated_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "supervisor".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");

    let filename = match ext {
        Some(ext) => format!("{stem}-{timestamp}.{ext}"),
        None => format!("{stem}-{timestamp}"),
    };

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(filename),
        _ => PathBuf::from(filename),
    }
}
