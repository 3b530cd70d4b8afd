use supervisor::config::{AutoRestart, ProgramConfig};
use supervisor::launcher;
use supervisor::logsink::EventLog;
use supervisor::runtime::{ProgramRuntime, ProgramState};
use supervisor::shutdown;

fn config(name: &str, command: &str) -> ProgramConfig {
    ProgramConfig {
        name: name.to_string(),
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
fn shutdown_terminates_a_long_running_child() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("sleeper", "sleep 100")];
    let pid = launcher::launch(&configs[0]).unwrap();
    let mut runtimes = vec![ProgramRuntime {
        pid: Some(pid),
        state: ProgramState::Running,
        restart_count: 0,
    }];
    let mut log = EventLog::open(&dir.path().join("events.log"));

    shutdown::shutdown_all(&configs, &mut runtimes, dir.path(), &mut log);

    assert_eq!(runtimes[0].state, ProgramState::Killed);
    assert_eq!(runtimes[0].pid, None);

    // the process really is gone, not just marked so
    let still_alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok();
    assert!(!still_alive);
}

#[test]
fn shutdown_handles_multiple_programs_independently() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("a", "sleep 100"), config("b", "sleep 100")];
    let pid_a = launcher::launch(&configs[0]).unwrap();
    let pid_b = launcher::launch(&configs[1]).unwrap();
    let mut runtimes = vec![
        ProgramRuntime {
            pid: Some(pid_a),
            state: ProgramState::Running,
            restart_count: 0,
        },
        ProgramRuntime {
            pid: Some(pid_b),
            state: ProgramState::Running,
            restart_count: 0,
        },
    ];
    let mut log = EventLog::open(&dir.path().join("events.log"));

    shutdown::shutdown_all(&configs, &mut runtimes, dir.path(), &mut log);

    assert!(runtimes.iter().all(|rt| rt.state == ProgramState::Killed));
    assert!(runtimes.iter().all(|rt| rt.pid.is_none()));
}
