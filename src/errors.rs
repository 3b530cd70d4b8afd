//! The error taxonomy for the supervisor.
//!
//! Only [`ConfigError`] ever propagates out of the supervision loop — it is
//! surfaced before any child is spawned and maps to process exit code `1`.
//! Everything else ([`ResourceError`], [`LaunchError`]) is recovered at the
//! call site: logged to the event sink and to `tracing`, never returned past
//! the function that produced it.

use thiserror::Error;

/// Failure loading and validating `supervisor.conf`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("{path}: program '{name}' has no command")]
    MissingCommand { path: String, name: String },
}

/// Failure applying or removing a cgroup limit. Always recovered, never
/// aborts the child it was meant to constrain.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("path for program '{name}' under {root} is too long")]
    PathTooLong { name: String, root: String },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure spawning or re-spawning a child. Always recovered; the runtime
/// slot is simply left as it was.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("failed to open {stream} redirection at {path}: {source}")]
    Redirect {
        stream: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
