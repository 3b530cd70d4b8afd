use std::io::Write;

use supervisor::config::{self, AutoRestart};
use supervisor::errors::ConfigError;

fn write_conf(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_multiple_programs_in_order() {
    let file = write_conf(
        "program web\n\
command = echo web\n\
autorestart = always\n\
\n\
program worker\n\
command = echo worker\n\
autostart = false\n\
max_restarts = 3\n",
    );

    let programs = config::load(file.path()).expect("config should load");
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].name, "web");
    assert_eq!(programs[0].autorestart, AutoRestart::Always);
    assert_eq!(programs[1].name, "worker");
    assert!(!programs[1].autostart);
    assert_eq!(programs[1].max_restarts, 3);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = config::load(std::path::Path::new("/nonexistent/supervisor.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn program_without_a_command_is_rejected() {
    let file = write_conf("program broken\nautostart = true\n");
    let err = config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCommand { .. }));
}
