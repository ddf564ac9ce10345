// crates/ibn-core/src/runtime/resolver.rs
// ============================================================================
// Module: Intent Resolver
// Description: Feasibility validation of a policy against an inventory snapshot.
// Purpose: Reject policies that reference unknown devices or lack commands/tests.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Resolution is a pure function. It stops at the first violated rule and
//! reports the step index and rule, matching the pipeline's fail-fast stance.
//! A successful resolution yields a [`ResolvedPolicy`], the only input the
//! activation engine accepts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::DeviceName;
use crate::core::InventorySnapshot;
use crate::core::Policy;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Resolution rule that a step violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionRule {
    /// Target device is not in the inventory.
    #[error("device '{0}' is not present in the inventory")]
    UnknownDevice(DeviceName),
    /// Step has no enforcement commands.
    #[error("step has no enforcement commands")]
    MissingEnforcement,
    /// Step has no validation commands.
    #[error("step has no validation commands")]
    MissingValidation,
    /// Step has no success criteria.
    #[error("step has no success criteria")]
    MissingCriteria,
}

/// First rule violation found while resolving a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resolution failed at step index {step_index}: {rule}")]
pub struct ResolutionFailure {
    /// Zero-based index of the offending step.
    pub step_index: usize,
    /// Violated rule.
    pub rule: ResolutionRule,
}

// ============================================================================
// SECTION: Resolved Policy
// ============================================================================

/// Policy proven feasible against a specific inventory snapshot.
///
/// # Invariants
/// - Every step targets a device in `inventory` and carries enforcement
///   commands, validation commands, and at least one criterion.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPolicy<'a> {
    /// Resolved policy.
    policy: &'a Policy,
    /// Snapshot the policy was resolved against.
    inventory: &'a InventorySnapshot,
}

impl<'a> ResolvedPolicy<'a> {
    /// Returns the resolved policy.
    #[must_use]
    pub const fn policy(&self) -> &'a Policy {
        self.policy
    }

    /// Returns the snapshot used for resolution.
    #[must_use]
    pub const fn inventory(&self) -> &'a InventorySnapshot {
        self.inventory
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Validates `policy` against `inventory`.
///
/// # Errors
///
/// Returns [`ResolutionFailure`] for the first step that violates a rule.
pub fn resolve<'a>(
    policy: &'a Policy,
    inventory: &'a InventorySnapshot,
) -> Result<ResolvedPolicy<'a>, ResolutionFailure> {
    for (step_index, step) in policy.steps.iter().enumerate() {
        let rule = if !inventory.contains(&step.device) {
            Some(ResolutionRule::UnknownDevice(step.device.clone()))
        } else if step.enforcement.is_empty() {
            Some(ResolutionRule::MissingEnforcement)
        } else if step.validation.is_empty() {
            Some(ResolutionRule::MissingValidation)
        } else if step.criteria.is_empty() {
            Some(ResolutionRule::MissingCriteria)
        } else {
            None
        };
        if let Some(rule) = rule {
            return Err(ResolutionFailure {
                step_index,
                rule,
            });
        }
    }
    Ok(ResolvedPolicy {
        policy,
        inventory,
    })
}
