// crates/ibn-core/src/runtime/activation.rs
// ============================================================================
// Module: Activation Engine
// Description: Pushes each step's enforcement commands to its target device.
// Purpose: Configure devices in declared order with per-device failure isolation.
// Dependencies: crate::{core, interfaces, runtime::batch}, tracing
// ============================================================================

//! ## Overview
//! Steps run strictly in declared order, one session per step. An unreachable
//! device fails only its own step; the engine continues with the remaining
//! steps and reports `failed` in aggregate if any step failed. Every attempted
//! step's transcript is returned for audit regardless of outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;

use crate::core::StageStatus;
use crate::core::StepActivation;
use crate::core::StepActivationStatus;
use crate::interfaces::SessionConnector;
use crate::runtime::batch::run_batch;
use crate::runtime::resolver::ResolvedPolicy;

// ============================================================================
// SECTION: Activation Result
// ============================================================================

/// Outcome of activating a resolved policy.
///
/// # Invariants
/// - `steps` holds one record per policy step, in declared order.
/// - `status` is `Failed` iff any step record is `Failed`, else `Activated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationResult {
    /// Per-step transcripts.
    pub steps: Vec<StepActivation>,
    /// Aggregate status.
    pub status: StageStatus,
}

impl ActivationResult {
    /// Returns the failed step records.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepActivation> {
        self.steps.iter().filter(|step| step.status == StepActivationStatus::Failed)
    }

    /// Returns a human-readable summary for the stage log.
    #[must_use]
    pub fn summary(&self) -> String {
        let failed: Vec<String> = self
            .failed_steps()
            .map(|step| {
                format!(
                    "step {} ({}): {}",
                    step.step_index,
                    step.device,
                    step.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();
        if failed.is_empty() {
            format!("enforcement commands executed on all {} steps", self.steps.len())
        } else {
            format!(
                "{} of {} steps failed: {}",
                failed.len(),
                self.steps.len(),
                failed.join("; ")
            )
        }
    }
}

// ============================================================================
// SECTION: Activation Engine
// ============================================================================

/// Executes enforcement commands through device sessions.
pub struct ActivationEngine<C> {
    /// Session connector.
    connector: C,
}

impl<C: SessionConnector> ActivationEngine<C> {
    /// Creates a new activation engine.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
        }
    }

    /// Activates every step of `resolved` in declared order.
    #[must_use]
    pub fn activate(&self, resolved: &ResolvedPolicy<'_>) -> ActivationResult {
        let policy = resolved.policy();
        let inventory = resolved.inventory();
        let mut steps = Vec::with_capacity(policy.steps.len());

        for (step_index, step) in policy.steps.iter().enumerate() {
            let record = match run_batch(&self.connector, inventory, &step.device, &step.enforcement)
            {
                Ok(transcript) => {
                    info!(
                        policy_id = %policy.policy_id,
                        step = step_index,
                        device = %step.device,
                        "step activated"
                    );
                    StepActivation {
                        step_index,
                        device: step.device.clone(),
                        status: StepActivationStatus::Activated,
                        commands: step.enforcement.clone(),
                        transcript,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(
                        policy_id = %policy.policy_id,
                        step = step_index,
                        device = %step.device,
                        error = %err,
                        "step activation failed"
                    );
                    StepActivation {
                        step_index,
                        device: step.device.clone(),
                        status: StepActivationStatus::Failed,
                        commands: step.enforcement.clone(),
                        transcript: err.partial_output().to_string(),
                        error: Some(err.to_string()),
                    }
                }
            };
            steps.push(record);
        }

        let status = if steps.iter().any(|step| step.status == StepActivationStatus::Failed) {
            StageStatus::Failed
        } else {
            StageStatus::Activated
        };
        ActivationResult {
            steps,
            status,
        }
    }
}
