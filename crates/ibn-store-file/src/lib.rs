// crates/ibn-store-file/src/lib.rs
// ============================================================================
// Module: IBN File Store
// Description: File-backed policy and inventory repositories.
// Purpose: Persist pipeline state as structured text an operator can read and edit.
// Dependencies: ibn-core, serde_json, serde_yaml, tempfile, tracing
// ============================================================================

//! ## Overview
//! The policy store is a YAML document keyed by policy id; the inventory is a
//! JSON snapshot. Both are read in full and rewritten in full on every save,
//! through a temporary file in the same directory that is renamed over the
//! target.
//!
//! There is no locking: two processes saving the same file race, and the last
//! rename wins.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::JsonInventoryStore;
pub use store::MAX_INVENTORY_FILE_BYTES;
pub use store::MAX_POLICY_FILE_BYTES;
pub use store::YamlPolicyStore;
