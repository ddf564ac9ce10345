// crates/ibn-core/src/runtime/mod.rs
// ============================================================================
// Module: IBN Runtime
// Description: Pipeline stages and the orchestrator that sequences them.
// Purpose: Execute resolution, activation, and assurance over injected backends.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! Runtime components are generic over the interfaces in [`crate::interfaces`]
//! and run synchronously on the caller's thread. Sessions are opened and closed
//! within a single step; nothing is shared across stage boundaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod activation;
pub mod assurance;
mod batch;
pub mod capture;
pub mod inventory_cache;
pub mod memory;
pub mod orchestrator;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use activation::ActivationEngine;
pub use activation::ActivationResult;
pub use assurance::ActivatedPolicy;
pub use assurance::AssuranceEngine;
pub use assurance::AssuranceResult;
pub use assurance::unmatched_criteria;
pub use capture::CaptureConfig;
pub use capture::CaptureEnd;
pub use capture::Captured;
pub use capture::Chunk;
pub use capture::ChunkSource;
pub use capture::DEFAULT_PROMPT_PATTERNS;
pub use capture::capture_output;
pub use capture::ends_with_prompt;
pub use inventory_cache::InventoryCache;
pub use memory::InMemoryInventoryStore;
pub use memory::InMemoryPolicyStore;
pub use memory::LogicalClock;
pub use orchestrator::PipelineError;
pub use orchestrator::PipelineOrchestrator;
pub use orchestrator::RunDisposition;
pub use orchestrator::RunOutcome;
pub use orchestrator::RunRequest;
pub use orchestrator::StopAfter;
pub use resolver::ResolutionFailure;
pub use resolver::ResolutionRule;
pub use resolver::ResolvedPolicy;
pub use resolver::resolve;
