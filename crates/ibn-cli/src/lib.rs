// crates/ibn-cli/src/lib.rs
// ============================================================================
// Module: IBN CLI Library
// Description: Shared helpers for the `ibn` command-line interface.
// Purpose: Keep clocks, identifiers, topology source selection, and report
// rendering testable outside the binary.
// Dependencies: ibn-core, ibn-providers, rand, time
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) wires configuration, stores, and
//! engines together; the pieces with their own behaviour live here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod render;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::SystemClock;
pub use clock::generate_policy_id;
pub use clock::new_policy_id;
pub use render::render_inventory;
pub use render::render_policy;
pub use render::render_policy_line;
pub use source::TopologySource;
