use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn missing_config_file_exits_with_code_one() {
    let mut cmd = Command::cargo_bin("supervisor").unwrap();
    cmd.arg("/nonexistent/supervisor.conf")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("cannot read config file"));
}

#[test]
fn malformed_config_exits_with_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("supervisor.conf");
    std::fs::write(&path, "program broken\nautostart = true\n").unwrap();

    let mut cmd = Command::cargo_bin("supervisor").unwrap();
    cmd.arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("has no command"));
}
