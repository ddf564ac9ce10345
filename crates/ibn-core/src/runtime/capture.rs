// crates/ibn-core/src/runtime/capture.rs
// ============================================================================
// Module: Output Capture Policy
// Description: Read-until-idle-or-prompt capture for console output.
// Purpose: Keep the capture rule independent of the transport so it can be
// exercised deterministically.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! After a command is written, output is accumulated until one of:
//! - a read waits `idle_timeout` without new bytes,
//! - the last line ends with a configured terminal-prompt pattern,
//! - the peer closes the stream,
//! - `max_output_bytes` have been captured.
//!
//! This is best-effort. A device that prints slower than the idle timeout is
//! truncated; callers treat short output as an assurance signal, not a crash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::interfaces::SessionError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default terminal-prompt patterns.
pub const DEFAULT_PROMPT_PATTERNS: &[&str] = &["#", ">", "$"];

/// Capture configuration.
///
/// # Invariants
/// - `prompt_patterns` are matched against the end of the last captured line.
/// - `max_output_bytes` is a hard upper bound per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Quiet period that ends a capture.
    pub idle_timeout: Duration,
    /// Terminal-prompt suffixes.
    pub prompt_patterns: Vec<String>,
    /// Maximum bytes captured per command.
    pub max_output_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(1_000),
            prompt_patterns: DEFAULT_PROMPT_PATTERNS.iter().map(ToString::to_string).collect(),
            max_output_bytes: 256 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Result of a single bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes arrived (possibly empty after protocol filtering).
    Data(Vec<u8>),
    /// The wait elapsed with no bytes.
    Idle,
    /// The peer closed the stream.
    Eof,
}

/// Byte source read by the capture loop.
pub trait ChunkSource {
    /// Waits up to `wait` for the next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the read fails.
    fn next_chunk(&mut self, wait: Duration) -> Result<Chunk, SessionError>;
}

/// Why a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnd {
    /// A terminal prompt was seen.
    Prompt,
    /// The idle timeout elapsed.
    Idle,
    /// The peer closed the stream.
    Eof,
    /// The output size bound was reached.
    Limit,
}

/// Captured output for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// Raw captured bytes.
    pub bytes: Vec<u8>,
    /// Reason the capture stopped.
    pub end: CaptureEnd,
}

impl Captured {
    /// Returns the output as trimmed, lossily decoded text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).trim().to_string()
    }
}

// ============================================================================
// SECTION: Capture Loop
// ============================================================================

/// Reads from `source` until idle, prompt, end of stream, or the size bound.
///
/// # Errors
///
/// Returns [`SessionError`] when the source fails.
pub fn capture_output<S: ChunkSource + ?Sized>(
    source: &mut S,
    config: &CaptureConfig,
) -> Result<Captured, SessionError> {
    let mut bytes = Vec::new();
    loop {
        match source.next_chunk(config.idle_timeout)? {
            Chunk::Idle => {
                return Ok(Captured {
                    bytes,
                    end: CaptureEnd::Idle,
                });
            }
            Chunk::Eof => {
                return Ok(Captured {
                    bytes,
                    end: CaptureEnd::Eof,
                });
            }
            Chunk::Data(data) => {
                let room = config.max_output_bytes.saturating_sub(bytes.len());
                if data.len() >= room {
                    bytes.extend_from_slice(&data[..room]);
                    return Ok(Captured {
                        bytes,
                        end: CaptureEnd::Limit,
                    });
                }
                bytes.extend_from_slice(&data);
                if ends_with_prompt(&bytes, &config.prompt_patterns) {
                    return Ok(Captured {
                        bytes,
                        end: CaptureEnd::Prompt,
                    });
                }
            }
        }
    }
}

/// Returns true when the last line of `bytes` ends with a prompt pattern.
#[must_use]
pub fn ends_with_prompt(bytes: &[u8], patterns: &[String]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches([' ', '\t']);
    let last_line = trimmed.rsplit(['\n', '\r']).next().unwrap_or_default();
    if last_line.trim().is_empty() {
        return false;
    }
    patterns.iter().any(|pattern| !pattern.is_empty() && last_line.ends_with(pattern.as_str()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
