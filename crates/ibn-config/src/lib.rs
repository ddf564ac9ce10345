// crates/ibn-config/src/lib.rs
// ============================================================================
// Module: IBN Config Library
// Description: Configuration model and loading for the intent pipeline.
// Purpose: Single source of truth for ibn.toml semantics.
// Dependencies: ibn-core, ibn-providers, ibn-telnet, serde, toml
// ============================================================================

//! ## Overview
//! `ibn-config` defines the `ibn.toml` model: the lab platform endpoint, the
//! state file locations, and console session tuning. Loading is strict and
//! fail-closed, and platform credentials can be supplied through the
//! environment.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
