// crates/ibn-telnet/tests/telnet_session.rs
// ============================================================================
// Module: Telnet Session Tests
// Description: Sessions against a fake console served from a local TCP listener.
// ============================================================================
//! ## Overview
//! A background thread plays a device console: it negotiates options, answers
//! each command line, and records every byte it receives.

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

use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use ibn_core::CaptureConfig;
use ibn_core::CommandSession;
use ibn_core::Endpoint;
use ibn_core::SessionConnector;
use ibn_core::SessionError;
use ibn_telnet::TelnetConfig;
use ibn_telnet::TelnetConnector;

// ============================================================================
// SECTION: Fake Console
// ============================================================================

const IAC: u8 = 255;

/// How the fake console answers.
#[derive(Clone, Copy)]
enum Behaviour {
    /// Answer every line and end with the prompt.
    Prompting,
    /// Answer every line but never print a prompt.
    Silent,
    /// Answer the first command with a prompt, then hang up.
    HangsUp,
}

struct FakeConsole {
    port: u16,
    received: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

fn strip_commands(line: &[u8]) -> String {
    let mut out = Vec::new();
    let mut index = 0;
    while index < line.len() {
        if line[index] == IAC {
            index += 3;
            continue;
        }
        if line[index] != b'\r' {
            out.push(line[index]);
        }
        index += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

fn reply_for(command: &str) -> String {
    match command {
        "show tech-support" => "x".repeat(10_000),
        other => format!("output of {other}"),
    }
}

fn spawn_console(behaviour: Behaviour) -> FakeConsole {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // DO TERMINAL-TYPE, WILL ECHO, then a banner without a prompt.
        stream.write_all(&[IAC, 253, 24, IAC, 251, 1]).unwrap();
        stream.write_all(b"\r\nUser Access Verification\r\n").unwrap();
        let mut pending = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let read = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(read) => read,
            };
            sink.lock().unwrap().extend_from_slice(&buf[.. read]);
            pending.extend_from_slice(&buf[.. read]);
            while let Some(newline) = pending.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = pending.drain(..= newline).collect();
                let command = strip_commands(&line[.. line.len() - 1]);
                let mut response = String::new();
                if !command.is_empty() {
                    response.push_str(&command);
                    response.push_str("\r\n");
                    response.push_str(&reply_for(&command));
                }
                response.push_str("\r\n");
                if matches!(behaviour, Behaviour::Prompting | Behaviour::HangsUp) {
                    response.push_str("R1#");
                }
                if stream.write_all(response.as_bytes()).is_err() {
                    return;
                }
                if matches!(behaviour, Behaviour::HangsUp) && !command.is_empty() {
                    return;
                }
            }
        }
    });
    FakeConsole {
        port,
        received,
        handle,
    }
}

fn connector(idle: Duration) -> TelnetConnector {
    TelnetConnector::new(TelnetConfig {
        platform_host: "127.0.0.1".to_string(),
        connect_timeout: Duration::from_secs(2),
        capture: CaptureConfig {
            idle_timeout: idle,
            max_output_bytes: 4096,
            ..CaptureConfig::default()
        },
        ..TelnetConfig::default()
    })
}

fn commands(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn captures_each_command_until_prompt() {
    let console = spawn_console(Behaviour::Prompting);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("0.0.0.0", console.port)).unwrap();
    assert_eq!(session.endpoint(), &Endpoint::new("127.0.0.1", console.port));
    let output = session.send(&commands(&["show version", "show ip route"])).unwrap();
    session.close().unwrap();
    console.handle.join().unwrap();

    assert_eq!(
        output,
        "show version\r\noutput of show version\r\nR1#\nshow ip route\r\noutput of show ip route\r\nR1#"
    );
}

#[test]
fn negotiation_is_refused() {
    let console = spawn_console(Behaviour::Prompting);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    session.send(&commands(&["show clock"])).unwrap();
    session.close().unwrap();
    console.handle.join().unwrap();

    let received = console.received.lock().unwrap().clone();
    assert!(received.windows(3).any(|window| window == [IAC, 252, 24]));
    assert!(received.windows(3).any(|window| window == [IAC, 254, 1]));
    assert!(received.starts_with(b"\r\n"));
}

#[test]
fn silent_console_ends_capture_on_idle() {
    let console = spawn_console(Behaviour::Silent);
    let connector = connector(Duration::from_millis(150));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    let output = session.send(&commands(&["show clock"])).unwrap();
    session.close().unwrap();
    console.handle.join().unwrap();

    assert_eq!(output, "show clock\r\noutput of show clock");
}

#[test]
fn hang_up_mid_batch_is_an_interruption_with_partial_output() {
    let console = spawn_console(Behaviour::HangsUp);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    let err = session
        .send(&commands(&["configure terminal", "access-list 101 deny ip any any", "end"]))
        .unwrap_err();
    session.close().unwrap();
    console.handle.join().unwrap();

    let SessionError::Interrupted {
        reason,
        output,
    } = &err
    else {
        panic!("expected an interruption, got {err:?}");
    };
    assert!(reason.contains("of 3"), "{reason}");
    assert_eq!(output, "configure terminal\r\noutput of configure terminal\r\nR1#");
    assert_eq!(err.partial_output(), output.as_str());
}

#[test]
fn hang_up_after_last_command_still_succeeds() {
    let console = spawn_console(Behaviour::HangsUp);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    let output = session.send(&commands(&["write memory"])).unwrap();
    session.close().unwrap();
    console.handle.join().unwrap();

    assert_eq!(output, "write memory\r\noutput of write memory\r\nR1#");
}

#[test]
fn oversized_output_is_capped_at_max_output_bytes() {
    let console = spawn_console(Behaviour::Prompting);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    let output = session.send(&commands(&["show tech-support"])).unwrap();
    session.close().unwrap();
    console.handle.join().unwrap();

    assert!(output.len() <= 4096);
    assert!(output.starts_with("show tech-support"));
}

#[test]
fn refused_connection_is_a_connection_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let connector = connector(Duration::from_millis(100));

    let err = connector.open(&Endpoint::new("127.0.0.1", port)).unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)));
}

#[test]
fn closed_session_rejects_commands() {
    let console = spawn_console(Behaviour::Prompting);
    let connector = connector(Duration::from_secs(2));

    let mut session = connector.open(&Endpoint::new("127.0.0.1", console.port)).unwrap();
    session.close().unwrap();
    session.close().unwrap();
    let err = session.send(&commands(&["show clock"])).unwrap_err();
    console.handle.join().unwrap();

    assert!(matches!(err, SessionError::Closed));
}
