// crates/ibn-core/src/core/mod.rs
// ============================================================================
// Module: IBN Core Model
// Description: Data model shared by every pipeline stage.
// Purpose: Group identifiers, time, inventory, and policy types.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The core model is pure data: no I/O, no wall-clock reads. Stages and
//! adapters exchange these types; persistence formats serialize them directly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod inventory;
pub mod policy;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::DeviceName;
pub use identifiers::PolicyId;
pub use inventory::Device;
pub use inventory::DeviceRole;
pub use inventory::DuplicateDeviceError;
pub use inventory::Endpoint;
pub use inventory::InventorySnapshot;
pub use inventory::Link;
pub use inventory::LinkEndpoint;
pub use policy::MatchMode;
pub use policy::Policy;
pub use policy::PolicyStep;
pub use policy::PolicyStoreFile;
pub use policy::Stage;
pub use policy::StageLogEntry;
pub use policy::StageStatus;
pub use policy::StepActivation;
pub use policy::StepActivationStatus;
pub use policy::StepAssurance;
pub use policy::StepVerdict;
pub use policy::SuccessCriterion;
pub use policy::TransitionError;
pub use policy::is_monotonic_trail;
pub use time::Timestamp;
