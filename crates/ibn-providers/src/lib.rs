// crates/ibn-providers/src/lib.rs
// ============================================================================
// Module: IBN Providers
// Description: Topology providers and translators for the intent pipeline.
// Purpose: Connect the pipeline to the lab platform and to offline step lists.
// Dependencies: ibn-core, reqwest, serde, serde_json, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! This crate ships the concrete topology sources (the GNS3 REST API and a
//! YAML lab description) and a translator that reads hand-written or
//! externally generated step lists.
//! Invariants:
//! - Platform and file inputs are size-limited and fail closed on bad data.
//! - Sources are re-read on every call; nothing is cached here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod file;
pub mod gns3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use file::FileTopologyProvider;
pub use file::MAX_SOURCE_FILE_BYTES;
pub use file::StepsFileTranslator;
pub use gns3::Gns3Config;
pub use gns3::Gns3Provider;
pub use gns3::role_for;
