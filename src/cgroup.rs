//! Resource-limit controller: applies cgroup v2 memory and CPU limits to a
//! managed program by writing to its `/sys/fs/cgroup` hierarchy.
//!
//! Mirrors the controller-file write discipline of the `cgroups-rs` crate:
//! verify the composed path fits a sane length, then open-truncate-write.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ProgramConfig;
use crate::errors::ResourceError;

/// Default root of the supervisor's cgroup v2 hierarchy.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup/supervisor";

/// cpu.max accounting period, in microseconds (100ms).
const CPU_PERIOD_US: u64 = 100_000;

/// Longest path this controller will attempt to open. Matches the
/// conservative bound `cgroups-rs` applies before handing a path to the
/// kernel, well under `PATH_MAX`.
const MAX_PATH_LEN: usize = 4096;

/// A cgroup v2 directory scoped to a single managed program.
pub struct ProgramCgroup {
    root: PathBuf,
    name: String,
}

impl ProgramCgroup {
    pub fn new(root: &Path, name: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            name: name.to_string(),
        }
    }

    fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn verify_path(&self, path: &Path) -> Result<(), ResourceError> {
        let as_str = path.to_string_lossy();
        if as_str.len() > MAX_PATH_LEN {
            return Err(ResourceError::PathTooLong {
                name: self.name.clone(),
                root: self.root.display().to_string(),
            });
        }
        Ok(())
    }

    fn write_file(&self, leaf: &str, contents: &str) -> Result<(), ResourceError> {
        let path = self.dir().join(leaf);
        self.verify_path(&path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| ResourceError::Io {
                action: "open",
                path: path.display().to_string(),
                source,
            })?;
        file.write_all(contents.as_bytes())
            .map_err(|source| ResourceError::Io {
                action: "write",
                path: path.display().to_string(),
                source,
            })
    }

    /// Creates the program's cgroup directory, applies `memory.max` and
    /// `cpu.max` from `config`, and writes `pid` to `cgroup.procs`. A
    /// `cpu_limit <= 0.0` or `memory_limit_bytes == 0` leaves that
    /// controller at its default (unlimited) setting.
    pub fn setup(&self, config: &ProgramConfig, pid: i32) -> Result<(), ResourceError> {
        let dir = self.dir();
        self.verify_path(&dir)?;
        fs::create_dir_all(&dir).map_err(|source| ResourceError::Io {
            action: "create",
            path: dir.display().to_string(),
            source,
        })?;

        if config.memory_limit_bytes > 0 {
            self.write_file("memory.max", &config.memory_limit_bytes.to_string())?;
        }

        if config.cpu_limit > 0.0 {
            let quota_us = (config.cpu_limit * CPU_PERIOD_US as f64).round() as u64;
            self.write_file("cpu.max", &format!("{quota_us} {CPU_PERIOD_US}"))?;
        }

        self.write_file("cgroup.procs", &pid.to_string())?;
        Ok(())
    }

    /// Removes the program's cgroup directory. A missing directory is not
    /// an error — cleanup may race a prior cleanup or a setup that never
    /// ran.
    pub fn cleanup(&self) -> Result<(), ResourceError> {
        let dir = self.dir();
        match fs::remove_dir(&dir) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ResourceError::Io {
                action: "remove",
                path: dir.display().to_string(),
                source,
            }),
        }
    }
}
