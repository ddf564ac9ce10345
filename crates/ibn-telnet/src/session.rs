// crates/ibn-telnet/src/session.rs
// ============================================================================
// Module: Telnet Sessions
// Description: Blocking TCP console sessions with idle/prompt output capture.
// Purpose: Implement the device session contract over raw telnet consoles.
// Dependencies: ibn-core, tracing
// ============================================================================

//! ## Overview
//! [`TelnetConnector`] dials a console endpoint, substituting the platform host
//! for wildcard bindings, and flushes the login banner by sending one empty
//! line. [`TelnetSession`] then sends commands one at a time and captures each
//! reply until the console prompt appears, the idle timeout elapses, or the
//! size bound is hit. Per-command outputs are joined with `\n`. A console that
//! hangs up before the last command is written fails the batch with
//! [`SessionError::Interrupted`], which keeps the output captured so far.
//!
//! The stream is shut down on [`CommandSession::close`] and again on drop, so
//! no code path leaks a console connection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use ibn_core::CaptureConfig;
use ibn_core::CaptureEnd;
use ibn_core::Chunk;
use ibn_core::ChunkSource;
use ibn_core::CommandSession;
use ibn_core::Endpoint;
use ibn_core::SessionConnector;
use ibn_core::SessionError;
use ibn_core::capture_output;
use tracing::debug;
use tracing::warn;

use crate::codec::TelnetDecoder;
use crate::codec::escape_iac;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Minimum socket read timeout; a zero timeout is rejected by the OS layer.
const MIN_READ_WAIT: Duration = Duration::from_millis(1);

/// Read buffer size per socket read.
const READ_CHUNK_BYTES: usize = 4096;

/// Telnet connector configuration.
///
/// # Invariants
/// - `platform_host` replaces wildcard console hosts before dialing.
/// - `capture` bounds every per-command read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelnetConfig {
    /// Host that serves platform-relative console ports.
    pub platform_host: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Output capture policy.
    pub capture: CaptureConfig,
    /// Terminator appended to every command.
    pub line_terminator: String,
    /// Send an empty line on open and discard the reply.
    pub flush_prompt: bool,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            platform_host: "127.0.0.1".to_string(),
            connect_timeout: Duration::from_secs(5),
            capture: CaptureConfig::default(),
            line_terminator: "\r\n".to_string(),
            flush_prompt: true,
        }
    }
}

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Opens telnet sessions to device consoles.
#[derive(Debug, Clone)]
pub struct TelnetConnector {
    /// Connector configuration.
    config: TelnetConfig,
}

impl TelnetConnector {
    /// Creates a connector with `config`.
    #[must_use]
    pub const fn new(config: TelnetConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the connector configuration.
    #[must_use]
    pub const fn config(&self) -> &TelnetConfig {
        &self.config
    }
}

impl SessionConnector for TelnetConnector {
    type Session = TelnetSession;

    fn open(&self, endpoint: &Endpoint) -> Result<TelnetSession, SessionError> {
        let target = endpoint.resolve_against(&self.config.platform_host);
        let stream = dial(&target, self.config.connect_timeout)?;
        stream
            .set_nodelay(true)
            .map_err(|err| SessionError::Connection(format!("{target}: {err}")))?;
        debug!(endpoint = %target, "console connected");

        let mut session = TelnetSession {
            stream: Some(stream),
            decoder: TelnetDecoder::new(),
            capture: self.config.capture.clone(),
            line_terminator: self.config.line_terminator.clone(),
            endpoint: target,
        };
        if self.config.flush_prompt {
            session.write_line("")?;
            let banner = capture_output(&mut session, &self.config.capture)?;
            debug!(endpoint = %session.endpoint, bytes = banner.bytes.len(), "banner flushed");
        }
        Ok(session)
    }
}

/// Connects to the first reachable address of `target`.
fn dial(target: &Endpoint, timeout: Duration) -> Result<TcpStream, SessionError> {
    let host = target.host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<SocketAddr> = (host, target.port)
        .to_socket_addrs()
        .map_err(|err| SessionError::Connection(format!("cannot resolve {target}: {err}")))?
        .collect();
    let mut last_error = format!("no addresses for {target}");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_error = format!("{target}: {err}"),
        }
    }
    Err(SessionError::Connection(last_error))
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Open console session on one device.
#[derive(Debug)]
pub struct TelnetSession {
    /// Console stream; `None` once closed.
    stream: Option<TcpStream>,
    /// Telnet decoder state.
    decoder: TelnetDecoder,
    /// Per-command capture policy.
    capture: CaptureConfig,
    /// Terminator appended to every command.
    line_terminator: String,
    /// Endpoint actually dialed.
    endpoint: Endpoint,
}

impl TelnetSession {
    /// Returns the endpoint this session is connected to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Writes `line` followed by the line terminator.
    fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::Closed)?;
        let mut payload = escape_iac(line.as_bytes());
        payload.extend_from_slice(self.line_terminator.as_bytes());
        stream.write_all(&payload).map_err(|err| SessionError::Io(err.to_string()))?;
        stream.flush().map_err(|err| SessionError::Io(err.to_string()))
    }
}

impl ChunkSource for TelnetSession {
    fn next_chunk(&mut self, wait: Duration) -> Result<Chunk, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::Closed)?;
        stream
            .set_read_timeout(Some(wait.max(MIN_READ_WAIT)))
            .map_err(|err| SessionError::Io(err.to_string()))?;
        let mut buf = [0_u8; READ_CHUNK_BYTES];
        match stream.read(&mut buf) {
            Ok(0) => Ok(Chunk::Eof),
            Ok(read) => {
                let decoded = self.decoder.feed(&buf[.. read]);
                if !decoded.replies.is_empty() {
                    stream
                        .write_all(&decoded.replies)
                        .map_err(|err| SessionError::Io(err.to_string()))?;
                }
                Ok(Chunk::Data(decoded.data))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Chunk::Idle)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(Chunk::Data(Vec::new())),
            Err(err) => Err(SessionError::Io(err.to_string())),
        }
    }
}

impl CommandSession for TelnetSession {
    fn send(&mut self, commands: &[String]) -> Result<String, SessionError> {
        let capture = self.capture.clone();
        let total = commands.len();
        let mut outputs = Vec::with_capacity(total);
        for (index, command) in commands.iter().enumerate() {
            let captured =
                match self.write_line(command).and_then(|()| capture_output(self, &capture)) {
                    Ok(captured) => captured,
                    Err(err) if outputs.is_empty() => return Err(err),
                    Err(err) => {
                        return Err(SessionError::Interrupted {
                            reason: format!("command {} of {total} failed: {err}", index + 1),
                            output: outputs.join("\n"),
                        });
                    }
                };
            debug!(
                endpoint = %self.endpoint,
                command = %command,
                bytes = captured.bytes.len(),
                prompt_seen = captured.end == CaptureEnd::Prompt,
                "command output captured"
            );
            let text = captured.text();
            if captured.end != CaptureEnd::Eof || !text.is_empty() {
                outputs.push(text);
            }
            if captured.end == CaptureEnd::Eof && index + 1 < total {
                warn!(endpoint = %self.endpoint, sent = index + 1, total, "console closed mid-batch");
                return Err(SessionError::Interrupted {
                    reason: format!("console closed during command {} of {total}", index + 1),
                    output: outputs.join("\n"),
                });
            }
        }
        Ok(outputs.join("\n"))
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(SessionError::Io(err.to_string())),
        }
    }
}

impl Drop for TelnetSession {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
