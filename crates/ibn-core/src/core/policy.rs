// crates/ibn-core/src/core/policy.rs
// ============================================================================
// Module: IBN Policy Model
// Description: Policies, steps, success criteria, stage status, and stage logs.
// Purpose: Define the durable record every pipeline stage reads and writes.
// Dependencies: crate::core::{identifiers, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Policy`] is the executable translation of one intent: an ordered list of
//! [`PolicyStep`]s plus the per-stage status, raw activation transcripts,
//! assurance verdicts, and an append-only stage log.
//!
//! Stage status only moves forward (`draft -> resolved -> activated -> assured`)
//! or to `failed`; [`Policy::transition`] rejects anything else so a run can
//! never silently regress a record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::DeviceName;
use crate::core::identifiers::PolicyId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Success Criteria
// ============================================================================

/// How a criterion's expected text is matched against captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Expected text occurs anywhere in the output.
    #[default]
    Substring,
    /// Some output line, trimmed, equals the expected text exactly.
    Line,
}

/// Declared expectation against validation output.
///
/// # Invariants
/// - Matching is case-sensitive with no fuzzy semantics.
/// - A bare string in the policy file deserializes as a substring criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CriterionRepr")]
pub struct SuccessCriterion {
    /// Expected text.
    pub expect: String,
    /// Match mode.
    #[serde(rename = "match", default)]
    pub mode: MatchMode,
}

/// Accepted on-disk shapes for a success criterion.
#[derive(Deserialize)]
#[serde(untagged)]
enum CriterionRepr {
    /// Bare expected substring.
    Bare(String),
    /// Explicit form with a match mode.
    Full {
        /// Expected text.
        expect: String,
        /// Match mode.
        #[serde(rename = "match", default)]
        mode: MatchMode,
    },
}

impl From<CriterionRepr> for SuccessCriterion {
    fn from(repr: CriterionRepr) -> Self {
        match repr {
            CriterionRepr::Bare(expect) => Self::substring(expect),
            CriterionRepr::Full {
                expect,
                mode,
            } => Self {
                expect,
                mode,
            },
        }
    }
}

impl SuccessCriterion {
    /// Creates a substring criterion.
    #[must_use]
    pub fn substring(expect: impl Into<String>) -> Self {
        Self {
            expect: expect.into(),
            mode: MatchMode::Substring,
        }
    }

    /// Creates an exact-line criterion.
    #[must_use]
    pub fn line(expect: impl Into<String>) -> Self {
        Self {
            expect: expect.into(),
            mode: MatchMode::Line,
        }
    }

    /// Returns true when `output` satisfies the criterion.
    ///
    /// An empty expectation only asks for some output to have been captured.
    #[must_use]
    pub fn is_satisfied_by(&self, output: &str) -> bool {
        if self.expect.is_empty() {
            return !output.trim().is_empty();
        }
        match self.mode {
            MatchMode::Substring => output.contains(self.expect.as_str()),
            MatchMode::Line => output.lines().any(|line| line.trim() == self.expect),
        }
    }
}

impl fmt::Display for SuccessCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            MatchMode::Substring => write!(f, "'{}'", self.expect),
            MatchMode::Line => write!(f, "line '{}'", self.expect),
        }
    }
}

// ============================================================================
// SECTION: Policy Steps
// ============================================================================

/// One device's enforcement and validation unit within a policy.
///
/// # Invariants
/// - A step without enforcement commands is never runnable.
/// - A step without validation commands and criteria cannot be assured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStep {
    /// Target device name.
    pub device: DeviceName,
    /// Optional operator-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Enforcement commands, order-significant.
    #[serde(default)]
    pub enforcement: Vec<String>,
    /// Validation commands, order-significant.
    #[serde(default)]
    pub validation: Vec<String>,
    /// Success criteria evaluated against validation output.
    #[serde(default)]
    pub criteria: Vec<SuccessCriterion>,
}

// ============================================================================
// SECTION: Stage Status
// ============================================================================

/// Pipeline stage status of a policy.
///
/// # Invariants
/// - Variants are stable for serialization.
/// - `Assured` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Intent captured; steps may still be missing.
    Draft,
    /// Steps validated against inventory.
    Resolved,
    /// Enforcement commands pushed to every target.
    Activated,
    /// Validation criteria satisfied on every target.
    Assured,
    /// A stage failed; requires human correction and a rerun.
    Failed,
}

impl StageStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Resolved => "resolved",
            Self::Activated => "activated",
            Self::Assured => "assured",
            Self::Failed => "failed",
        }
    }

    /// Position along the forward path; `None` for `Failed`.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Draft => Some(0),
            Self::Resolved => Some(1),
            Self::Activated => Some(2),
            Self::Assured => Some(3),
            Self::Failed => None,
        }
    }

    /// Returns true for terminal statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Assured | Self::Failed)
    }

    /// Returns true when moving from `self` to `next` is allowed.
    ///
    /// Non-terminal statuses may stay put, advance by exactly one, or fail.
    #[must_use]
    pub const fn permits(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(_), None) => true,
            (Some(from), Some(to)) => to == from || to == from + 1,
            _ => false,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `trail` is a prefix of `draft, resolved, activated,
/// assured`, optionally ending in a single `failed`.
#[must_use]
pub fn is_monotonic_trail(trail: &[StageStatus]) -> bool {
    let mut expected: u8 = 0;
    for (index, status) in trail.iter().enumerate() {
        match status.rank() {
            None => return index + 1 == trail.len(),
            Some(rank) if rank == expected => expected += 1,
            Some(_) => return false,
        }
    }
    true
}

// ============================================================================
// SECTION: Stage Log
// ============================================================================

/// Pipeline stage that produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Policy record created or reset.
    Intake,
    /// Inventory refresh or lookup.
    Inventory,
    /// External translation of intent into steps.
    Translate,
    /// Feasibility validation.
    Resolve,
    /// Enforcement push.
    Activate,
    /// Post-activation validation.
    Assure,
}

impl Stage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Inventory => "inventory",
            Self::Translate => "translate",
            Self::Resolve => "resolve",
            Self::Activate => "activate",
            Self::Assure => "assure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only stage log entry.
///
/// # Invariants
/// - `seq` is monotonic within a policy.
/// - `status` is the policy status after the entry was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLogEntry {
    /// Monotonic sequence number.
    pub seq: u64,
    /// Entry timestamp.
    pub at: Timestamp,
    /// Stage that produced the entry.
    pub stage: Stage,
    /// Policy status after the entry.
    pub status: StageStatus,
    /// Human-readable outcome.
    pub message: String,
}

// ============================================================================
// SECTION: Step Records
// ============================================================================

/// Activation outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepActivationStatus {
    /// Enforcement commands were sent and output captured.
    Activated,
    /// The device could not be reached or the session broke.
    Failed,
}

/// Raw activation transcript for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepActivation {
    /// Index of the step within the policy.
    pub step_index: usize,
    /// Target device.
    pub device: DeviceName,
    /// Step outcome.
    pub status: StepActivationStatus,
    /// Commands that were attempted.
    pub commands: Vec<String>,
    /// Captured output (possibly partial or empty).
    #[serde(default)]
    pub transcript: String,
    /// Error detail when the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Assurance verdict for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepVerdict {
    /// Every criterion was satisfied.
    Pass,
    /// At least one criterion was unmet or the device was unreachable.
    Fail,
    /// The step was not activated, so validation was not attempted.
    Skipped,
}

impl StepVerdict {
    /// Returns a stable label for the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
        }
    }
}

/// Assurance record for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAssurance {
    /// Index of the step within the policy.
    pub step_index: usize,
    /// Target device.
    pub device: DeviceName,
    /// Verdict.
    pub verdict: StepVerdict,
    /// Captured validation output.
    #[serde(default)]
    pub output: String,
    /// Criteria that were not satisfied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<SuccessCriterion>,
    /// Error detail when validation could not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Rejected stage status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal stage transition for policy {policy_id}: {from} -> {to}")]
pub struct TransitionError {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Current status.
    pub from: StageStatus,
    /// Requested status.
    pub to: StageStatus,
}

/// Structured translation of an intent plus its pipeline history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Original natural-language intent.
    pub intent: String,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<PolicyStep>,
    /// Current stage status.
    pub status: StageStatus,
    /// Capture time of the inventory the steps were last resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_against: Option<Timestamp>,
    /// Activation transcripts, one per attempted step.
    #[serde(default)]
    pub activation: Vec<StepActivation>,
    /// Assurance verdicts, one per step.
    #[serde(default)]
    pub assurance: Vec<StepAssurance>,
    /// Stage log.
    #[serde(default)]
    pub log: Vec<StageLogEntry>,
}

impl Policy {
    /// Creates an empty draft for `intent`.
    #[must_use]
    pub fn draft(policy_id: PolicyId, intent: impl Into<String>) -> Self {
        Self {
            policy_id,
            intent: intent.into(),
            steps: Vec::new(),
            status: StageStatus::Draft,
            resolved_against: None,
            activation: Vec::new(),
            assurance: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Moves the policy to `next` and appends a log entry.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `next` would regress or leave a terminal status.
    pub fn transition(
        &mut self,
        next: StageStatus,
        stage: Stage,
        at: Timestamp,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.permits(next) {
            return Err(TransitionError {
                policy_id: self.policy_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.note(stage, at, message);
        Ok(())
    }

    /// Appends a log entry without changing status.
    pub fn note(&mut self, stage: Stage, at: Timestamp, message: impl Into<String>) {
        let seq = self.log.last().map_or(1, |entry| entry.seq + 1);
        self.log.push(StageLogEntry {
            seq,
            at,
            stage,
            status: self.status,
            message: message.into(),
        });
    }

    /// Returns the status history from the log with consecutive repeats collapsed.
    #[must_use]
    pub fn status_trail(&self) -> Vec<StageStatus> {
        let mut trail: Vec<StageStatus> = Vec::with_capacity(self.log.len());
        for entry in &self.log {
            if trail.last() != Some(&entry.status) {
                trail.push(entry.status);
            }
        }
        trail
    }

    /// Returns the stage whose entry moved the policy to `failed`, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        self.log
            .iter()
            .find(|entry| entry.status == StageStatus::Failed)
            .map(|entry| entry.stage)
    }
}

// ============================================================================
// SECTION: Policy Store File
// ============================================================================

/// Durable aggregate of every policy ever processed.
///
/// # Invariants
/// - Each key equals the `policy_id` of the policy it indexes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyStoreFile {
    /// Policies keyed by identifier.
    #[serde(default)]
    pub policies: BTreeMap<PolicyId, Policy>,
}

impl PolicyStoreFile {
    /// Looks up a policy by identifier.
    #[must_use]
    pub fn get(&self, policy_id: &PolicyId) -> Option<&Policy> {
        self.policies.get(policy_id)
    }

    /// Inserts or replaces a policy under its own identifier.
    pub fn upsert(&mut self, policy: Policy) {
        self.policies.insert(policy.policy_id.clone(), policy);
    }

    /// Returns the first key whose policy carries a different identifier.
    #[must_use]
    pub fn mismatched_key(&self) -> Option<&PolicyId> {
        self.policies.iter().find(|(key, policy)| **key != policy.policy_id).map(|(key, _)| key)
    }
}
