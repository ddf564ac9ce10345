// crates/ibn-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end runs of the `ibn` binary against a fake console.
// Purpose: Validate exit codes, persisted state, and command output.
// Dependencies: ibn-cli binary, tempfile
// ============================================================================

//! ## Overview
//! Each test writes a config, a topology file, and optionally a steps file
//! into a temporary directory, then invokes the built binary. A background
//! listener plays the firewall console and echoes its command history, so
//! validation output contains the enforcement commands sent before it.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const ENFORCE: &str = "access-list 101 deny tcp any any eq 23";

fn ibn_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ibn"))
}

/// Starts a console that answers every connection; returns its port.
fn spawn_console() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let history = Arc::new(Mutex::new(Vec::<String>::new()));
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let history = Arc::clone(&history);
            thread::spawn(move || serve_console(stream, &history));
        }
    });
    port
}

fn serve_console(mut stream: TcpStream, history: &Mutex<Vec<String>>) {
    let mut pending = Vec::new();
    let mut buf = [0_u8; 1024];
    loop {
        let read = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        pending.extend_from_slice(&buf[.. read]);
        while let Some(end) = pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = pending.drain(..= end).collect();
            let command = String::from_utf8_lossy(&line).trim().to_string();
            let reply = if command.is_empty() {
                "\r\nfw1#".to_string()
            } else {
                let mut seen = history.lock().unwrap();
                seen.push(command.clone());
                format!("{command}\r\n{}\r\nfw1#", seen.join("\r\n"))
            };
            if stream.write_all(reply.as_bytes()).is_err() {
                return;
            }
        }
    }
}

struct Lab {
    dir: TempDir,
    config: PathBuf,
    topology: PathBuf,
}

impl Lab {
    fn new(console_port: u16) -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("ibn.toml");
        fs::write(
            &config,
            format!(
                "[platform]\nhost = \"127.0.0.1\"\n\n[paths]\npolicies = \"{}\"\ninventory = \
                 \"{}\"\n\n[session]\nidle_timeout_ms = 300\n",
                dir.path().join("policies.yaml").display(),
                dir.path().join("inventory.json").display(),
            ),
        )
        .unwrap();
        let topology = dir.path().join("lab.yaml");
        fs::write(
            &topology,
            format!(
                "topology: ibn-lab\ndevices:\n  - name: fw1\n    role: firewall\n    console: {{ \
                 host: 127.0.0.1, port: {console_port} }}\n  - name: pc1\n    role: workstation\n"
            ),
        )
        .unwrap();
        Self {
            dir,
            config,
            topology,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_steps(&self, device: &str) -> PathBuf {
        let path = self.path("steps.yaml");
        fs::write(
            &path,
            format!(
                "- device: {device}\n  enforcement:\n    - {ENFORCE}\n  validation:\n    - show \
                 access-lists\n  criteria:\n    - deny tcp any any eq 23\n"
            ),
        )
        .unwrap();
        path
    }

    fn ibn(&self, args: &[&str]) -> Output {
        Command::new(ibn_bin())
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env_remove("IBN_CONFIG")
            .env_remove("GNS3_SERVER_IP")
            .env_remove("GNS3_SERVER_PORT")
            .env_remove("GNS3_SERVER_USER")
            .env_remove("GNS3_SERVER_PASSWORD")
            .env_remove("GNS3_PROJECT")
            .env("IBN_LOG", "off")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn as_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// SECTION: Run
// ============================================================================

#[test]
fn run_with_steps_reaches_assured() {
    let lab = Lab::new(spawn_console());
    let steps = lab.write_steps("fw1");

    let output = lab.ibn(&[
        "run",
        "--intent",
        "block telnet through fw1",
        "--policy-id",
        "p1",
        "--refresh-inventory",
        "--topology-file",
        as_str(&lab.topology),
        "--steps",
        as_str(&steps),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "p1\tassured\tassured");

    let shown = lab.ibn(&["policy", "show", "p1", "--format", "yaml"]);
    assert_eq!(shown.status.code(), Some(0));
    let yaml = stdout(&shown);
    assert!(yaml.contains("status: assured"), "{yaml}");
    assert!(yaml.contains(ENFORCE));

    let listed = lab.ibn(&["policy", "list"]);
    assert_eq!(stdout(&listed), "p1\tassured\tblock telnet through fw1\n");
}

#[test]
fn run_without_steps_awaits_translation() {
    let lab = Lab::new(spawn_console());

    let output = lab.ibn(&[
        "run",
        "--intent",
        "isolate pc1",
        "--policy-id",
        "p2",
        "--refresh-inventory",
        "--topology-file",
        as_str(&lab.topology),
    ]);

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "p2\tdraft\tawaiting_steps");
}

#[test]
fn unknown_device_fails_the_policy() {
    let lab = Lab::new(spawn_console());
    let steps = lab.write_steps("ghost");

    let output = lab.ibn(&[
        "run",
        "--intent",
        "block telnet on ghost",
        "--policy-id",
        "p3",
        "--refresh-inventory",
        "--topology-file",
        as_str(&lab.topology),
        "--steps",
        as_str(&steps),
    ]);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    let text = stdout(&lab.ibn(&["policy", "show", "p3"]));
    assert!(text.contains("status: failed"), "{text}");
    assert!(text.contains("ghost"));
}

#[test]
fn skip_activation_stops_after_resolution() {
    let lab = Lab::new(spawn_console());
    let steps = lab.write_steps("fw1");

    let output = lab.ibn(&[
        "run",
        "--intent",
        "block telnet through fw1",
        "--policy-id",
        "p4",
        "--refresh-inventory",
        "--skip-activation",
        "--topology-file",
        as_str(&lab.topology),
        "--steps",
        as_str(&steps),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "p4\tresolved\tstopped_after_resolution");
}

// ============================================================================
// SECTION: Usage and Environment Errors
// ============================================================================

#[test]
fn resuming_an_unknown_policy_is_an_error() {
    let lab = Lab::new(spawn_console());
    let output = lab.ibn(&["run", "--policy-id", "missing"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("policy missing does not exist"));
}

#[test]
fn run_without_target_is_a_usage_error() {
    let lab = Lab::new(spawn_console());
    let output = lab.ibn(&["run"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let lab = Lab::new(spawn_console());
    let output = lab.ibn(&["run", "--no-such-flag"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn missing_explicit_config_is_reported() {
    let output = Command::new(ibn_bin())
        .args(["--config", "/nonexistent/ibn.toml", "policy", "list"])
        .env("IBN_LOG", "off")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("config io error"));
}

#[test]
fn refresh_without_project_or_file_reports_configuration() {
    let lab = Lab::new(spawn_console());
    let output = lab.ibn(&["inventory", "refresh"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("platform.project"), "{}", stderr(&output));
}

// ============================================================================
// SECTION: Inventory
// ============================================================================

#[test]
fn refresh_only_run_persists_inventory() {
    let lab = Lab::new(spawn_console());

    let output =
        lab.ibn(&["run", "--refresh-inventory", "--topology-file", as_str(&lab.topology)]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "inventory refreshed: 2 devices, 0 links");
    assert!(lab.path("inventory.json").exists());
    assert!(!lab.path("policies.yaml").exists());

    let shown = lab.ibn(&["inventory", "show", "--format", "json"]);
    assert_eq!(shown.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(json["topology"], "ibn-lab");
    assert!(json["devices"]["fw1"].is_object());

    let text = stdout(&lab.ibn(&["inventory", "show"]));
    assert!(text.contains("fw1 [firewall]"), "{text}");
}

#[test]
fn show_without_snapshot_is_an_error() {
    let lab = Lab::new(spawn_console());
    let output = lab.ibn(&["inventory", "show"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("no inventory snapshot"));
}
