// crates/ibn-telnet/src/lib.rs
// ============================================================================
// Module: IBN Telnet
// Description: Telnet console sessions for lab devices.
// Purpose: Provide the blocking command session used by activation and assurance.
// Dependencies: ibn-core, tracing
// ============================================================================

//! ## Overview
//! This crate implements the device session contract over raw TCP consoles as
//! exposed by network emulators. Sessions are synchronous; each read is bounded
//! by the configured idle timeout and the capture stops at the console prompt.
//! Invariants:
//! - Telnet options are always refused; the peer is driven as a plain NVT.
//! - Wildcard console hosts are replaced by the platform host before dialing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::TelnetDecoder;
pub use session::TelnetConfig;
pub use session::TelnetConnector;
pub use session::TelnetSession;
