use supervisor::config::{AutoRestart, ProgramConfig};
use supervisor::launcher;
use supervisor::reap;
use supervisor::runtime::{ProgramRuntime, ProgramState};

fn config(name: &str, command: &str, autorestart: AutoRestart, max_restarts: u32) -> ProgramConfig {
    ProgramConfig {
        name: name.to_string(),
        command: command.to_string(),
        autostart: true,
        autorestart,
        restart_delay: 0,
        max_restarts,
        memory_limit_bytes: 0,
        cpu_limit: 0.0,
        stdout_path: None,
        stderr_path: None,
    }
}

fn logger(dir: &tempfile::TempDir) -> supervisor::logsink::EventLog {
    supervisor::logsink::EventLog::open(&dir.path().join("events.log"))
}

#[test]
fn on_failure_program_is_relaunched_after_a_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("flaky", "exit 1", AutoRestart::OnFailure, 5)];
    let pid = launcher::launch(&configs[0]).unwrap();
    let mut runtimes = vec![ProgramRuntime {
        pid: Some(pid),
        state: ProgramState::Running,
        restart_count: 0,
    }];
    let mut log = logger(&dir);

    // give the child a moment to exit before the first drain
    std::thread::sleep(std::time::Duration::from_millis(200));
    reap::drain(&configs, &mut runtimes, dir.path(), &mut log);

    assert_eq!(runtimes[0].restart_count, 1);
    assert_eq!(runtimes[0].state, ProgramState::Running);
    assert!(runtimes[0].pid.is_some());

    // clean up the relaunched child
    let new_pid = runtimes[0].pid.unwrap();
    let _ = nix::sys::wait::waitpid(nix::unistd::Pid::from_raw(new_pid), None);
}

#[test]
fn never_restart_program_stays_exited() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("oneshot", "exit 0", AutoRestart::Never, 0)];
    let pid = launcher::launch(&configs[0]).unwrap();
    let mut runtimes = vec![ProgramRuntime {
        pid: Some(pid),
        state: ProgramState::Running,
        restart_count: 0,
    }];
    let mut log = logger(&dir);

    std::thread::sleep(std::time::Duration::from_millis(200));
    reap::drain(&configs, &mut runtimes, dir.path(), &mut log);

    assert_eq!(runtimes[0].state, ProgramState::Exited);
    assert_eq!(runtimes[0].pid, None);
    assert_eq!(runtimes[0].restart_count, 0);
}

#[test]
fn restart_cap_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("capped", "exit 1", AutoRestart::OnFailure, 1)];
    let mut runtimes = vec![ProgramRuntime {
        pid: None,
        state: ProgramState::Running,
        restart_count: 1,
    }];
    let pid = launcher::launch(&configs[0]).unwrap();
    runtimes[0].pid = Some(pid);
    let mut log = logger(&dir);

    std::thread::sleep(std::time::Duration::from_millis(200));
    reap::drain(&configs, &mut runtimes, dir.path(), &mut log);

    // already at max_restarts before this exit, so no further relaunch happens
    assert_eq!(runtimes[0].restart_count, 1);
    assert_eq!(runtimes[0].state, ProgramState::Stopped);
    assert_eq!(runtimes[0].pid, None);
}

#[test]
fn always_policy_restarts_without_touching_restart_count() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![config("forever", "exit 1", AutoRestart::Always, 1)];
    let mut runtimes = vec![ProgramRuntime {
        pid: None,
        state: ProgramState::Running,
        restart_count: 1,
    }];
    let pid = launcher::launch(&configs[0]).unwrap();
    runtimes[0].pid = Some(pid);
    let mut log = logger(&dir);

    std::thread::sleep(std::time::Duration::from_millis(200));
    reap::drain(&configs, &mut runtimes, dir.path(), &mut log);

    // ALWAYS restarts unconditionally; max_restarts never applies to it and
    // restart_count is left untouched.
    assert_eq!(runtimes[0].restart_count, 1);
    assert_eq!(runtimes[0].state, ProgramState::Running);
    assert!(runtimes[0].pid.is_some());

    let new_pid = runtimes[0].pid.unwrap();
    let _ = nix::sys::wait::waitpid(nix::unistd::Pid::from_raw(new_pid), None);
}
