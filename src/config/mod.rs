//! Configuration loading.
//!
//! Parses the line-oriented `supervisor.conf` format into a `Vec<ProgramConfig>`.
//! This is the only place configuration errors originate; once `load` returns
//! `Ok`, the configuration is immutable for the remainder of the process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Maximum length, in bytes, of a program name — it doubles as the
/// filesystem leaf under the cgroup hierarchy.
pub const MAX_NAME_LEN: usize = 63;

/// Restart policy for a managed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoRestart {
    Never,
    OnFailure,
    Always,
}

/// Identity and policy for one managed program. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramConfig {
    pub name: String,
    pub command: String,
    pub autostart: bool,
    pub autorestart: AutoRestart,
    pub restart_delay: u64,
    pub max_restarts: u32,
    pub memory_limit_bytes: u64,
    pub cpu_limit: f64,
    pub stdout_path: Option<PathBuf>,
    pub stderr_path: Option<PathBuf>,
}

impl ProgramConfig {
    fn new(name: String) -> Self {
        Self {
            name,
            command: String::new(),
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
}

fn validate_name(path: &str, line: usize, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: "program name must not be empty".to_string(),
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: format!("program name '{name}' exceeds {MAX_NAME_LEN} bytes"),
        });
    }
    if name.contains('/') || name.contains('\0') {
        return Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: format!("program name '{name}' must not contain a path separator"),
        });
    }
    Ok(())
}

fn parse_bool(path: &str, line: usize, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: format!("expected true/false, got '{other}'"),
        }),
    }
}

fn parse_autorestart(path: &str, line: usize, value: &str) -> Result<AutoRestart, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "never" => Ok(AutoRestart::Never),
        "on-failure" => Ok(AutoRestart::OnFailure),
        "always" => Ok(AutoRestart::Always),
        other => Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: format!("expected never/on-failure/always, got '{other}'"),
        }),
    }
}

fn parse_u64(path: &str, line: usize, field: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::Parse {
        path: path.to_string(),
        line,
        reason: format!("{field} must be a non-negative integer, got '{value}'"),
    })
}

fn parse_u32(path: &str, line: usize, field: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::Parse {
        path: path.to_string(),
        line,
        reason: format!("{field} must be a non-negative integer, got '{value}'"),
    })
}

fn parse_f64(path: &str, line: usize, field: &str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = value.parse().map_err(|_| ConfigError::Parse {
        path: path.to_string(),
        line,
        reason: format!("{field} must be a real number, got '{value}'"),
    })?;
    if parsed < 0.0 {
        return Err(ConfigError::Parse {
            path: path.to_string(),
            line,
            reason: format!("{field} must be >= 0, got '{value}'"),
        });
    }
    Ok(parsed)
}

/// Parses an integer with an optional case-insensitive KB/MB/GB suffix into
/// a byte count. No suffix means the value is already in bytes.
fn parse_memory_limit(path: &str, line: usize, value: &str) -> Result<u64, ConfigError> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();
    let (digits, multiplier) = if let Some(d) = upper.strip_suffix("KB") {
        (d, 1024u64)
    } else if let Some(d) = upper.strip_suffix("MB") {
        (d, 1024u64 * 1024)
    } else if let Some(d) = upper.strip_suffix("GB") {
        (d, 1024u64 * 1024 * 1024)
    } else {
        (upper.as_str(), 1u64)
    };
    let digits = digits.trim();
    let base: u64 = digits.parse().map_err(|_| ConfigError::Parse {
        path: path.to_string(),
        line,
        reason: format!("memory_limit must be an integer with optional KB/MB/GB suffix, got '{value}'"),
    })?;
    Ok(base.saturating_mul(multiplier))
}

/// Parses `supervisor.conf` at `path` into an ordered list of program
/// configurations. Order is preserved so the caller can build an
/// index-aligned runtime array.
pub fn load(path: &Path) -> Result<Vec<ProgramConfig>, ConfigError> {
    let path_str = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path_str.clone(),
        source,
    })?;
    parse(&path_str, &contents)
}

fn parse(path: &str, contents: &str) -> Result<Vec<ProgramConfig>, ConfigError> {
    let mut programs: Vec<ProgramConfig> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;

    for (zero_based, raw_line) in contents.lines().enumerate() {
        let line_no = zero_based + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("program ") {
            let name = rest.trim().to_string();
            validate_name(path, line_no, &name)?;
            if let Some(&existing) = index_by_name.get(&name) {
                current = Some(existing);
            } else {
                let idx = programs.len();
                programs.push(ProgramConfig::new(name.clone()));
                index_by_name.insert(name, idx);
                current = Some(idx);
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Parse {
                path: path.to_string(),
                line: line_no,
                reason: format!("expected 'key = value' or a 'program <name>' header, got '{line}'"),
            });
        };
        let key = key.trim();
        let value = value.trim();

        let Some(idx) = current else {
            return Err(ConfigError::Parse {
                path: path.to_string(),
                line: line_no,
                reason: format!("'{key}' set outside of any program block"),
            });
        };
        let program = &mut programs[idx];

        match key {
            "command" => program.command = value.to_string(),
            "autostart" => program.autostart = parse_bool(path, line_no, value)?,
            "autorestart" => program.autorestart = parse_autorestart(path, line_no, value)?,
            "restart_delay" => {
                program.restart_delay = parse_u64(path, line_no, "restart_delay", value)?
            }
            "max_restarts" => program.max_restarts = parse_u32(path, line_no, "max_restarts", value)?,
            "stdout" => program.stdout_path = Some(PathBuf::from(value)),
            "stderr" => program.stderr_path = Some(PathBuf::from(value)),
            "memory_limit" => program.memory_limit_bytes = parse_memory_limit(path, line_no, value)?,
            "cpu_limit" => program.cpu_limit = parse_f64(path, line_no, "cpu_limit", value)?,
            other => {
                return Err(ConfigError::Parse {
                    path: path.to_string(),
                    line: line_no,
                    reason: format!("unrecognized key '{other}'"),
                })
            }
        }
    }

    for program in &programs {
        if program.command.is_empty() {
            return Err(ConfigError::MissingCommand {
                path: path.to_string(),
                name: program.name.clone(),
            });
        }
    }

    Ok(programs)
}
