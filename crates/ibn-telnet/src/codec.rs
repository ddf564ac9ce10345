// crates/ibn-telnet/src/codec.rs
// ============================================================================
// Module: Telnet Codec
// Description: Streaming decoder for telnet command sequences.
// Purpose: Separate console text from option negotiation and refuse every option.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Device consoles speak raw telnet. The decoder strips command sequences from
//! the byte stream and produces refusal replies so the peer falls back to a
//! plain NVT: `DO x` is answered with `WONT x`, `WILL x` with `DONT x`.
//! Subnegotiation blocks are discarded and `IAC IAC` decodes to a literal 255.
//! The decoder is resumable across arbitrary read boundaries.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interpret-as-command marker.
pub const IAC: u8 = 255;
/// Refuse to let the peer perform an option.
pub const DONT: u8 = 254;
/// Ask the peer to perform an option.
pub const DO: u8 = 253;
/// Refuse to perform an option.
pub const WONT: u8 = 252;
/// Offer to perform an option.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

// ============================================================================
// SECTION: Decoder
// ============================================================================

/// Decoder position within the telnet stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Plain data.
    #[default]
    Data,
    /// After `IAC`.
    Command,
    /// After `IAC <verb>`, awaiting the option byte.
    Option(u8),
    /// Inside a subnegotiation block.
    Subnegotiation,
    /// After `IAC` inside a subnegotiation block.
    SubnegotiationCommand,
}

/// Output of one decoder step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// Console text with command sequences removed.
    pub data: Vec<u8>,
    /// Negotiation replies to write back to the peer.
    pub replies: Vec<u8>,
}

/// Resumable telnet stream decoder.
#[derive(Debug, Clone, Default)]
pub struct TelnetDecoder {
    /// Current position.
    state: State,
}

impl TelnetDecoder {
    /// Creates a decoder positioned at plain data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `input`, continuing from the previous call's state.
    #[must_use]
    pub fn feed(&mut self, input: &[u8]) -> Decoded {
        let mut out = Decoded {
            data: Vec::with_capacity(input.len()),
            replies: Vec::new(),
        };
        for &byte in input {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Command,
                (State::Data, 0) => State::Data,
                (State::Data, _) => {
                    out.data.push(byte);
                    State::Data
                }
                (State::Command, IAC) => {
                    out.data.push(IAC);
                    State::Data
                }
                (State::Command, DO | DONT | WILL | WONT) => State::Option(byte),
                (State::Command, SB) => State::Subnegotiation,
                (State::Command, _) => State::Data,
                (State::Option(verb), option) => {
                    match verb {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    State::Data
                }
                (State::Subnegotiation, IAC) => State::SubnegotiationCommand,
                (State::Subnegotiation, _) => State::Subnegotiation,
                (State::SubnegotiationCommand, SE) => State::Data,
                (State::SubnegotiationCommand, _) => State::Subnegotiation,
            };
        }
        out
    }
}

/// Escapes literal 255 bytes in outbound data.
#[must_use]
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
