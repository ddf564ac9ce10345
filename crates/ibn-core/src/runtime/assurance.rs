// crates/ibn-core/src/runtime/assurance.rs
// ============================================================================
// Module: Assurance Engine
// Description: Runs validation commands and evaluates success criteria.
// Purpose: Verify that enforcement achieved the intended effect on each device.
// Dependencies: crate::{core, interfaces, runtime::batch}, tracing
// ============================================================================

//! ## Overview
//! Each step that activated successfully gets a fresh session running its
//! validation commands; every declared criterion is then matched against the
//! captured text. Steps that did not activate are recorded as `skipped`, never
//! silently omitted. The policy is assured only when every step passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;

use crate::core::InventorySnapshot;
use crate::core::Policy;
use crate::core::PolicyStep;
use crate::core::StageStatus;
use crate::core::StepActivation;
use crate::core::StepActivationStatus;
use crate::core::StepAssurance;
use crate::core::StepVerdict;
use crate::core::SuccessCriterion;
use crate::interfaces::SessionConnector;
use crate::runtime::batch::run_batch;

// ============================================================================
// SECTION: Activated Policy
// ============================================================================

/// Policy paired with its activation records and the inventory to reach devices.
#[derive(Debug, Clone, Copy)]
pub struct ActivatedPolicy<'a> {
    /// Activated policy.
    policy: &'a Policy,
    /// Per-step activation records.
    activation: &'a [StepActivation],
    /// Inventory used to reach devices.
    inventory: &'a InventorySnapshot,
}

impl<'a> ActivatedPolicy<'a> {
    /// Pairs `policy` with explicit activation records.
    #[must_use]
    pub const fn new(
        policy: &'a Policy,
        activation: &'a [StepActivation],
        inventory: &'a InventorySnapshot,
    ) -> Self {
        Self {
            policy,
            activation,
            inventory,
        }
    }

    /// Uses the activation records persisted on the policy itself.
    #[must_use]
    pub fn from_record(policy: &'a Policy, inventory: &'a InventorySnapshot) -> Self {
        Self::new(policy, &policy.activation, inventory)
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &'a Policy {
        self.policy
    }

    /// Returns true when step `step_index` was activated successfully.
    #[must_use]
    pub fn step_activated(&self, step_index: usize) -> bool {
        self.activation.iter().any(|record| {
            record.step_index == step_index && record.status == StepActivationStatus::Activated
        })
    }
}

// ============================================================================
// SECTION: Assurance Result
// ============================================================================

/// Outcome of assuring an activated policy.
///
/// # Invariants
/// - `steps` holds one record per policy step, in declared order.
/// - `status` is `Assured` iff every step verdict is `Pass`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssuranceResult {
    /// Per-step verdicts.
    pub steps: Vec<StepAssurance>,
    /// Aggregate status.
    pub status: StageStatus,
    /// Human-readable explanation listing offending steps.
    pub explanation: String,
}

// ============================================================================
// SECTION: Assurance Engine
// ============================================================================

/// Runs validation commands through device sessions.
pub struct AssuranceEngine<C> {
    /// Session connector.
    connector: C,
}

impl<C: SessionConnector> AssuranceEngine<C> {
    /// Creates a new assurance engine.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
        }
    }

    /// Assures every step of `activated` in declared order.
    #[must_use]
    pub fn assure(&self, activated: &ActivatedPolicy<'_>) -> AssuranceResult {
        let policy = activated.policy();
        let mut steps = Vec::with_capacity(policy.steps.len());

        for (step_index, step) in policy.steps.iter().enumerate() {
            let record = if activated.step_activated(step_index) {
                self.assure_step(activated.inventory, step_index, step)
            } else {
                StepAssurance {
                    step_index,
                    device: step.device.clone(),
                    verdict: StepVerdict::Skipped,
                    output: String::new(),
                    unmatched: Vec::new(),
                    error: Some("step was not activated".to_string()),
                }
            };
            match record.verdict {
                StepVerdict::Pass => info!(
                    policy_id = %policy.policy_id,
                    step = step_index,
                    device = %step.device,
                    "step assured"
                ),
                StepVerdict::Fail | StepVerdict::Skipped => warn!(
                    policy_id = %policy.policy_id,
                    step = step_index,
                    device = %step.device,
                    verdict = record.verdict.as_str(),
                    "step not assured"
                ),
            }
            steps.push(record);
        }

        let offending: Vec<String> = steps
            .iter()
            .filter(|step| step.verdict != StepVerdict::Pass)
            .map(describe_offending_step)
            .collect();
        if offending.is_empty() {
            let explanation = format!("all {} validation steps passed", steps.len());
            AssuranceResult {
                steps,
                status: StageStatus::Assured,
                explanation,
            }
        } else {
            let explanation = format!(
                "{} of {} steps not assured: {}",
                offending.len(),
                steps.len(),
                offending.join("; ")
            );
            AssuranceResult {
                steps,
                status: StageStatus::Failed,
                explanation,
            }
        }
    }

    /// Runs one step's validation batch and evaluates its criteria.
    fn assure_step(
        &self,
        inventory: &InventorySnapshot,
        step_index: usize,
        step: &PolicyStep,
    ) -> StepAssurance {
        match run_batch(&self.connector, inventory, &step.device, &step.validation) {
            Ok(output) => {
                let unmatched = unmatched_criteria(&step.criteria, &output);
                let verdict = if unmatched.is_empty() && !step.criteria.is_empty() {
                    StepVerdict::Pass
                } else {
                    StepVerdict::Fail
                };
                StepAssurance {
                    step_index,
                    device: step.device.clone(),
                    verdict,
                    output,
                    unmatched,
                    error: None,
                }
            }
            Err(err) => StepAssurance {
                step_index,
                device: step.device.clone(),
                verdict: StepVerdict::Fail,
                output: err.partial_output().to_string(),
                unmatched: step.criteria.clone(),
                error: Some(err.to_string()),
            },
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the criteria not satisfied by `output`.
#[must_use]
pub fn unmatched_criteria(criteria: &[SuccessCriterion], output: &str) -> Vec<SuccessCriterion> {
    criteria.iter().filter(|criterion| !criterion.is_satisfied_by(output)).cloned().collect()
}

/// Formats one non-passing step for the assurance explanation.
fn describe_offending_step(step: &StepAssurance) -> String {
    let mut text = format!("step {} ({}) {}", step.step_index, step.device, step.verdict.as_str());
    if let Some(error) = &step.error {
        text.push_str(": ");
        text.push_str(error);
    } else if !step.unmatched.is_empty() {
        let unmatched: Vec<String> = step.unmatched.iter().map(ToString::to_string).collect();
        text.push_str(": unmatched ");
        text.push_str(&unmatched.join(", "));
    }
    text
}
