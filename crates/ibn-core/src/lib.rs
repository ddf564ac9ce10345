// crates/ibn-core/src/lib.rs
// ============================================================================
// Module: IBN Core
// Description: Intent-based networking pipeline model, interfaces, and runtime.
// Purpose: Turn a natural-language intent into device configuration that is
// resolved, activated, and assured against a captured lab topology.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! `ibn-core` carries the backend-agnostic half of the pipeline:
//!
//! - [`core`]: policies, steps, criteria, inventory snapshots, stage logs.
//! - [`interfaces`]: topology providers, translators, repositories, device
//!   sessions, and clocks.
//! - [`runtime`]: the inventory cache, intent resolver, activation and
//!   assurance engines, and the [`PipelineOrchestrator`] state machine.
//!
//! Invariants:
//! - A policy's status only advances forward or moves to `failed`.
//! - Every step of an activated policy targets a device in the snapshot it was
//!   resolved against.
//! - Device sessions never outlive the stage step that opened them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;
pub use crate::interfaces::*;
pub use crate::runtime::*;
