//! Smoke tests for the `smt-portfolio` binary itself, using a PATH rigged
//! with tiny mock "solvers" so the tests don't depend on a real SMT solver
//! being installed.

use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a mock solver executable named `name` under `dir/bin` that just
/// echoes `output` and ignores its arguments.
fn mock_solver(dir: &Path, name: &str, output: &str) {
    let bin_dir = dir.join("bin");
    fs::create_dir_all(&bin_dir).unwrap();
    let path = bin_dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\necho '{output}'").unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
    fs::set_permissions(&path, perms).unwrap();
}

fn write_definitions(dir: &Path, solvers: &[&str]) -> std::path::PathBuf {
    let jsi_dir = dir.join(".jsi");
    fs::create_dir_all(&jsi_dir).unwrap();
    let mut json = String::from("{");
    for (i, name) in solvers.iter().enumerate() {
        if i > 0 {
            json.push(',');
        }
        json.push_str(&format!(
            r#""{name}":{{"executable":"{name}","model":null,"args":[]}}"#
        ));
    }
    json.push('}');
    let defs_path = jsi_dir.join("definitions.json");
    fs::write(&defs_path, json).unwrap();
    defs_path
}

#[test]
fn reports_decisive_result_and_exits_zero() {
    let tmp = TempDir::new().unwrap();
    mock_solver(tmp.path(), "mocksolver", "sat");
    write_definitions(tmp.path(), &["mocksolver"]);

    let input = tmp.path().join("input.smt2");
    fs::write(&input, "(check-sat)\n").unwrap();

    let path_var = format!(
        "{}:{}",
        tmp.path().join("bin").display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let mut cmd = Command::cargo_bin("smt-portfolio").unwrap();
    cmd.env("HOME", tmp.path())
        .env("PATH", path_var)
        .arg(&input)
        .arg("--timeout")
        .arg("5s");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sat"))
        .stdout(predicate::str::contains("showing result for mocksolver"))
        .stderr(predicate::str::contains("mocksolver"));
}

#[test]
fn missing_input_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("smt-portfolio").unwrap();
    cmd.env("HOME", tmp.path())
        .arg(tmp.path().join("does-not-exist.smt2"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
