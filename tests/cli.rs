use assert_cmd::Command;

fn version_output() -> String {
    format!("dynsem {}\n", env!("CARGO_PKG_VERSION"))
}

#[test]
fn version_flag_prints_package_version() {
    let expected = version_output();
    Command::cargo_bin("dynsem")
        .expect("binary exists")
        .arg("--version")
        .assert()
        .success()
        .stdout(expected.clone())
        .stderr("");

    Command::cargo_bin("dynsem")
        .expect("binary exists")
        .arg("-v")
        .assert()
        .success()
        .stdout(expected)
        .stderr("");
}

#[test]
fn help_flag_prints_usage() {
    let output = Command::cargo_bin("dynsem")
        .expect("binary exists")
        .arg("--help")
        .output()
        .expect("help output");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Usage:"), "stdout was: {stdout}");
    assert!(
        stdout.contains("-v, --version"),
        "stdout was missing version flag: {stdout}"
    );
    assert!(output.stderr.is_empty(), "stderr was not empty");
}

#[test]
fn running_without_arguments_prints_usage_and_fails() {
    let output = Command::cargo_bin("dynsem")
        .expect("binary exists")
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Usage:"), "stderr was: {stderr}");
}

#[test]
fn running_a_program_prints_its_writes() {
    Command::cargo_bin("dynsem")
        .expect("binary exists")
        .arg("demos/sumprimes.e2")
        .assert()
        .success()
        .stdout("328\n")
        .stderr("");
}

#[test]
fn running_with_missing_file_returns_error() {
    let output = Command::cargo_bin("dynsem")
        .expect("binary exists")
        .arg("demos/does-not-exist.e2")
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read `demos/does-not-exist.e2`"),
        "stderr was: {stderr}"
    );
}
