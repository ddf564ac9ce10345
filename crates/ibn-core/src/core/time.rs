// crates/ibn-core/src/core/time.rs
// ============================================================================
// Module: IBN Time Model
// Description: Timestamp representation for inventory captures and stage logs.
// Purpose: Keep pipeline records replayable by never reading wall-clock time in core.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core engine never reads wall-clock time directly. Hosts supply
//! timestamps through a [`crate::Clock`]; tests use logical time so persisted
//! records are deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Timestamp used in inventory snapshots and policy stage logs.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixMillis(value) => write!(f, "unix_ms:{value}"),
            Self::Logical(value) => write!(f, "logical:{value}"),
        }
    }
}
