//! End-to-end tests of the deployprobe binary
//!
//! The remote host is replaced by a shell script standing in for `ssh`; it
//! answers each orchestrator command with canned output.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_SSH: &str = r#"#!/bin/sh
for last; do :; done
case "$last" in
  *"network inspect"*)
    printf 'edge-proxy\nfrontend\nbackend\n' ;;
  *"exec frontend curl"*"http://backend:8000/health"*)
    printf '{"status":"ok"}\n' ;;
  *"exec edge-proxy curl"*"http://frontend:3000/"*)
    printf '<!DOCTYPE html>\n<html lang="en">\n' ;;
  *"exec "*)
    echo "curl: (7) Failed to connect" >&2; exit 7 ;;
  *"docker logs backend"*)
    printf 'INFO boot\nERROR db timeout\nINFO retry\n' ;;
  *"docker logs"*)
    printf 'INFO all quiet\n' ;;
  *"docker ps"*)
    printf 'backend|Up 2 hours|0.0.0.0:8000->8000/tcp\nfrontend|Up 2 hours|3000/tcp\n' ;;
  *)
    echo "unexpected: $last" >&2; exit 1 ;;
esac
"#;

fn deployprobe() -> Command {
    let mut cmd = Command::cargo_bin("deployprobe").unwrap();
    cmd.env_remove("DEPLOYPROBE_CONFIG")
        .env_remove("DEPLOYPROBE_HOST")
        .env_remove("DEPLOYPROBE_SSH_USER")
        .env_remove("DEPLOYPROBE_SSH_PORT")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &Path, ssh_program: &Path) -> PathBuf {
    let path = dir.join("deployprobe.toml");
    fs::write(
        &path,
        format!(
            "host = \"203.0.113.10\"\nssh_user = \"deploy\"\nssh_program = \"{}\"\n",
            ssh_program.display()
        ),
    )
    .unwrap();
    path
}

#[cfg(unix)]
fn fake_ssh(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ssh");
    fs::write(&path, FAKE_SSH).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    deployprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("diagnose"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("config"));
}

#[cfg(unix)]
#[test]
fn test_diagnose_transcript() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &fake_ssh(dir.path()));

    deployprobe()
        .arg("--config")
        .arg(&config)
        .arg("diagnose")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Deployment diagnostics: 203.0.113.10 ==="))
        .stdout(predicate::str::contains("--- Network app-network ---"))
        .stdout(predicate::str::contains("Missing from network: realtime-server"))
        .stdout(predicate::str::contains("frontend -> backend:\n{\"status\":\"ok\"}\n"))
        .stdout(predicate::str::contains("edge-proxy -> frontend:\n<!DOCTYPE html>\n"))
        .stdout(predicate::str::contains("frontend -> realtime-server:\nFAILED\n"))
        .stdout(predicate::str::contains("--- Recent errors: backend ---\nERROR db timeout\n"))
        .stdout(predicate::str::contains("--- Recent errors: frontend ---\nNo errors found\n"))
        .stdout(predicate::str::contains("--- Container status ---"))
        .stdout(predicate::str::contains("0.0.0.0:8000->8000/tcp"))
        .stdout(predicate::str::contains("<html").not());
}

#[cfg(unix)]
#[test]
fn test_diagnose_reports_exactly_five_probes() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &fake_ssh(dir.path()));

    let output = deployprobe()
        .arg("--config")
        .arg(&config)
        .args(["diagnose", "--phase", "reachability", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let probes = report["reachability"].as_array().unwrap();
    assert_eq!(probes.len(), 5);
    assert_eq!(probes[0]["label"], "frontend -> backend");
    assert_eq!(probes[0]["outcome"]["line"], "{\"status\":\"ok\"}");
    assert_eq!(probes[1]["outcome"]["result"], "failed");
    assert_eq!(probes[1]["outcome"]["reason"]["code"], 7);
    assert!(report.get("logs").is_none());
}

#[cfg(unix)]
#[test]
fn test_strict_mode_exits_degraded() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &fake_ssh(dir.path()));

    deployprobe()
        .arg("--config")
        .arg(&config)
        .args(["diagnose", "--phase", "reachability", "--strict"])
        .assert()
        .code(2);
}

#[test]
fn test_unreachable_host_still_completes() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), Path::new("/nonexistent/ssh-binary"));

    deployprobe()
        .arg("--config")
        .arg(&config)
        .args(["diagnose", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frontend -> backend (http://backend:8000/health):\nFAILED"))
        .stdout(predicate::str::contains("No errors found (log fetch failed:"))
        .stdout(predicate::str::contains("--- Container status ---"));
}

#[test]
fn test_config_init_and_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.toml");

    deployprobe()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));
    assert!(path.is_file());

    deployprobe()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to overwrite"));

    deployprobe()
        .arg("--config")
        .arg(&path)
        .args(["--host", "198.51.100.4", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host = \"198.51.100.4\""))
        .stdout(predicate::str::contains("network_name = \"app-network\""));
}

#[test]
fn test_config_init_replaces_broken_local_config() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("deployprobe.toml");
    fs::write(&broken, "host = [").unwrap();

    deployprobe()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("config")
        .arg("show")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load configuration"));

    deployprobe()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .args(["config", "init", "--force", "--output"])
        .arg(&broken)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));

    deployprobe()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .args(["config", "validate", "--file"])
        .arg(&broken)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_rejects_bad_matrix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
host = "203.0.113.10"

[[services]]
name = "frontend"
port = 3000

[[probes]]
source = "frontend"
destination = "backend"
path = "/health"
"#,
    )
    .unwrap();

    deployprobe()
        .args(["config", "validate", "--file"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("destination backend is not a declared service"))
        .stderr(predicate::str::contains("configuration has 1 error(s)"));

    deployprobe()
        .arg("--config")
        .arg(&path)
        .arg("diagnose")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
