// crates/ibn-cli/src/clock.rs
// ============================================================================
// Module: Wall Clock and Policy Identifiers
// Description: System clock for captures and logs; generated policy ids.
// Purpose: Supply the host time the core never reads on its own.
// Dependencies: ibn-core, rand, time
// ============================================================================

//! ## Overview
//! Stage logs and inventory captures are stamped in unix milliseconds.
//! Generated policy ids read `policy-YYYYMMDDHHMMSS-xxxxxx`: a UTC timestamp
//! followed by six random hex digits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ibn_core::Clock;
use ibn_core::PolicyId;
use ibn_core::Timestamp;
use rand::Rng;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall clock reporting UTC unix milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::UnixMillis(unix_millis(OffsetDateTime::now_utc()))
    }
}

/// Converts a date-time to unix milliseconds, saturating out-of-range values.
fn unix_millis(at: OffsetDateTime) -> i64 {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
}

// ============================================================================
// SECTION: Policy Identifiers
// ============================================================================

/// Builds a policy id from `at` (converted to UTC) and six hex digits drawn from `rng`.
#[must_use]
pub fn generate_policy_id<R: Rng + ?Sized>(at: OffsetDateTime, rng: &mut R) -> PolicyId {
    let at = at.to_offset(time::UtcOffset::UTC);
    let suffix: u32 = rng.gen_range(0 ..= 0x00ff_ffff);
    PolicyId::new(format!(
        "policy-{:04}{:02}{:02}{:02}{:02}{:02}-{suffix:06x}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
    ))
}

/// Generates a policy id for the current time.
#[must_use]
pub fn new_policy_id() -> PolicyId {
    generate_policy_id(OffsetDateTime::now_utc(), &mut rand::thread_rng())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
