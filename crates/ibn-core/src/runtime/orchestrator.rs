// crates/ibn-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Pipeline Orchestrator
// Description: Stage state machine driving a policy from draft to assured.
// Purpose: Run translate, resolve, activate, and assure with a persisted record
// after every stage so any run can resume from the last stored status.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The orchestrator holds no state between invocations. Each [`PipelineOrchestrator::run`]
//! loads the policy store file, advances the requested policy as far as it can,
//! and rewrites the full store after every stage outcome:
//!
//! ```text
//! draft --translate--> draft
//! draft --resolve--> resolved | failed
//! resolved --activate--> activated | failed
//! activated --assure--> assured | failed
//! ```
//!
//! Invariants:
//! - Status changes only through [`Policy::transition`], so a record never
//!   regresses.
//! - Terminal policies are returned untouched; nothing is written.
//! - Stop-after controls end traversal early without altering status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::InventorySnapshot;
use crate::core::Policy;
use crate::core::PolicyId;
use crate::core::Stage;
use crate::core::StageStatus;
use crate::core::TransitionError;
use crate::interfaces::Clock;
use crate::interfaces::InventoryError;
use crate::interfaces::InventorySource;
use crate::interfaces::PolicyRepository;
use crate::interfaces::SessionConnector;
use crate::interfaces::StoreError;
use crate::interfaces::TranslationContext;
use crate::interfaces::Translator;
use crate::runtime::activation::ActivationEngine;
use crate::runtime::assurance::ActivatedPolicy;
use crate::runtime::assurance::AssuranceEngine;
use crate::runtime::resolver::resolve;

// ============================================================================
// SECTION: Requests and Outcomes
// ============================================================================

/// Furthest stage a run may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopAfter {
    /// Run until the policy is terminal.
    #[default]
    Completion,
    /// Stop once the policy is resolved; never activate.
    Resolution,
    /// Stop once the policy is activated; never assure.
    Activation,
}

/// Pipeline run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Policy to create or resume.
    pub policy_id: PolicyId,
    /// Intent text; required when the policy does not exist yet.
    pub intent: Option<String>,
    /// Refresh the inventory snapshot before running.
    pub refresh_inventory: bool,
    /// Furthest stage to traverse.
    pub stop_after: StopAfter,
}

impl RunRequest {
    /// Creates a request that resumes `policy_id` to completion.
    #[must_use]
    pub const fn resume(policy_id: PolicyId) -> Self {
        Self {
            policy_id,
            intent: None,
            refresh_inventory: false,
            stop_after: StopAfter::Completion,
        }
    }

    /// Creates a request for `policy_id` carrying `intent`.
    #[must_use]
    pub fn with_intent(policy_id: PolicyId, intent: impl Into<String>) -> Self {
        Self {
            policy_id,
            intent: Some(intent.into()),
            refresh_inventory: false,
            stop_after: StopAfter::Completion,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDisposition {
    /// The policy is assured.
    Assured,
    /// The policy is failed.
    Failed,
    /// The policy is still a draft without usable steps.
    AwaitingSteps,
    /// Traversal stopped after resolution on request.
    StoppedAfterResolution,
    /// Traversal stopped after activation on request.
    StoppedAfterActivation,
}

impl RunDisposition {
    /// Returns a stable label for the disposition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assured => "assured",
            Self::Failed => "failed",
            Self::AwaitingSteps => "awaiting_steps",
            Self::StoppedAfterResolution => "stopped_after_resolution",
            Self::StoppedAfterActivation => "stopped_after_activation",
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Policy as persisted at the end of the run.
    pub policy: Policy,
    /// How the run ended.
    pub disposition: RunDisposition,
}

/// Errors that abort a run before a stage outcome can be recorded.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The policy does not exist and no intent was supplied.
    #[error("policy {0} does not exist; supply an intent to create it")]
    UnknownPolicy(PolicyId),
    /// The supplied intent text is blank.
    #[error("intent text is empty")]
    EmptyIntent,
    /// The inventory could not be refreshed or read.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    /// The policy store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stage attempted an illegal status change.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Stateless driver for the intent pipeline.
pub struct PipelineOrchestrator<S, I, C, T, K> {
    /// Policy store repository.
    store: S,
    /// Inventory cache.
    inventory: I,
    /// Device session connector shared by activation and assurance.
    connector: C,
    /// Intent translator.
    translator: T,
    /// Clock stamping log entries.
    clock: K,
}

impl<S, I, C, T, K> PipelineOrchestrator<S, I, C, T, K>
where
    S: PolicyRepository,
    I: InventorySource,
    C: SessionConnector,
    T: Translator,
    K: Clock,
{
    /// Creates a new orchestrator.
    pub const fn new(store: S, inventory: I, connector: C, translator: T, clock: K) -> Self {
        Self {
            store,
            inventory,
            connector,
            translator,
            clock,
        }
    }

    /// Runs the pipeline for `request`.
    ///
    /// Stage failures are not errors: they are recorded on the policy and
    /// reported through [`RunDisposition::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when intake, inventory access, or persistence
    /// fails. Inventory failures are appended to the policy log before returning.
    pub fn run(&self, request: &RunRequest) -> Result<RunOutcome, PipelineError> {
        let mut policy = self.intake(request)?;

        let refreshed = if request.refresh_inventory {
            match self.inventory.refresh() {
                Ok(snapshot) => Some(snapshot),
                Err(err) => return Err(self.abort_on_inventory(policy, err)),
            }
        } else {
            None
        };

        if policy.status.is_terminal() {
            info!(
                policy_id = %policy.policy_id,
                status = %policy.status,
                "policy is terminal; nothing to run"
            );
            let disposition = terminal_disposition(policy.status);
            return Ok(RunOutcome {
                policy,
                disposition,
            });
        }

        let snapshot = match refreshed {
            Some(snapshot) => snapshot,
            None => match self.inventory.current() {
                Ok(snapshot) => snapshot,
                Err(err) => return Err(self.abort_on_inventory(policy, err)),
            },
        };

        loop {
            match policy.status {
                StageStatus::Draft => {
                    if policy.steps.is_empty() && !self.translate(&mut policy, &snapshot)? {
                        return Ok(RunOutcome {
                            policy,
                            disposition: RunDisposition::AwaitingSteps,
                        });
                    }
                    self.resolve_draft(&mut policy, &snapshot)?;
                }
                StageStatus::Resolved => {
                    if request.stop_after == StopAfter::Resolution {
                        info!(policy_id = %policy.policy_id, "stopping after resolution");
                        return Ok(RunOutcome {
                            policy,
                            disposition: RunDisposition::StoppedAfterResolution,
                        });
                    }
                    self.activate(&mut policy, &snapshot)?;
                }
                StageStatus::Activated => {
                    if request.stop_after != StopAfter::Completion {
                        info!(policy_id = %policy.policy_id, "stopping after activation");
                        return Ok(RunOutcome {
                            policy,
                            disposition: RunDisposition::StoppedAfterActivation,
                        });
                    }
                    self.assure(&mut policy, &snapshot)?;
                }
                StageStatus::Assured | StageStatus::Failed => {
                    let disposition = terminal_disposition(policy.status);
                    return Ok(RunOutcome {
                        policy,
                        disposition,
                    });
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------------

    /// Loads, creates, or resets the requested policy.
    fn intake(&self, request: &RunRequest) -> Result<Policy, PipelineError> {
        let intent = match request.intent.as_deref().map(str::trim) {
            Some("") => return Err(PipelineError::EmptyIntent),
            other => other,
        };
        let file = self.store.load()?;

        match (file.get(&request.policy_id), intent) {
            (Some(existing), Some(intent)) if existing.intent.trim() != intent => {
                let mut policy = Policy::draft(request.policy_id.clone(), intent);
                policy.note(
                    Stage::Intake,
                    self.clock.now(),
                    format!("intent changed; previous {} record replaced by a new draft", existing.status),
                );
                info!(policy_id = %policy.policy_id, "intent changed; policy reset to draft");
                self.persist(&policy)?;
                Ok(policy)
            }
            (Some(existing), _) => {
                info!(
                    policy_id = %existing.policy_id,
                    status = %existing.status,
                    "resuming policy"
                );
                Ok(existing.clone())
            }
            (None, Some(intent)) => {
                let mut policy = Policy::draft(request.policy_id.clone(), intent);
                policy.note(Stage::Intake, self.clock.now(), "policy created from intent");
                info!(policy_id = %policy.policy_id, "policy created");
                self.persist(&policy)?;
                Ok(policy)
            }
            (None, None) => Err(PipelineError::UnknownPolicy(request.policy_id.clone())),
        }
    }

    /// Records an inventory failure on a non-terminal policy and builds the error.
    fn abort_on_inventory(&self, mut policy: Policy, err: InventoryError) -> PipelineError {
        warn!(policy_id = %policy.policy_id, error = %err, "inventory unavailable; run aborted");
        if policy.status.is_terminal() {
            return PipelineError::Inventory(err);
        }
        policy.note(Stage::Inventory, self.clock.now(), err.to_string());
        match self.persist(&policy) {
            Ok(()) => PipelineError::Inventory(err),
            Err(store) => PipelineError::Store(store),
        }
    }

    // ------------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------------

    /// Fills a draft's steps through the translator. Returns false when the
    /// translation produced nothing usable.
    fn translate(
        &self,
        policy: &mut Policy,
        snapshot: &InventorySnapshot,
    ) -> Result<bool, PipelineError> {
        let context = TranslationContext::from_snapshot(snapshot);
        let translated = match self.translator.translate(&policy.intent, &context) {
            Ok(steps) if !steps.is_empty() => {
                let message = format!("intent translated into {} steps", steps.len());
                policy.steps = steps;
                policy.note(Stage::Translate, self.clock.now(), message);
                true
            }
            Ok(_) => {
                policy.note(
                    Stage::Translate,
                    self.clock.now(),
                    "translation produced no steps; policy awaits steps",
                );
                false
            }
            Err(err) => {
                policy.note(
                    Stage::Translate,
                    self.clock.now(),
                    format!("{err}; policy awaits steps"),
                );
                false
            }
        };
        if translated {
            info!(policy_id = %policy.policy_id, steps = policy.steps.len(), "intent translated");
        } else {
            warn!(policy_id = %policy.policy_id, "translation produced nothing usable");
        }
        self.persist(policy)?;
        Ok(translated)
    }

    /// Resolves a draft against `snapshot`.
    fn resolve_draft(
        &self,
        policy: &mut Policy,
        snapshot: &InventorySnapshot,
    ) -> Result<(), PipelineError> {
        let verdict = resolve(policy, snapshot).map(|_| ());
        match verdict {
            Ok(()) => {
                policy.resolved_against = Some(snapshot.captured_at);
                policy.transition(
                    StageStatus::Resolved,
                    Stage::Resolve,
                    self.clock.now(),
                    format!(
                        "{} steps resolved against inventory captured at {}",
                        policy.steps.len(),
                        snapshot.captured_at
                    ),
                )?;
                info!(policy_id = %policy.policy_id, "policy resolved");
            }
            Err(failure) => {
                warn!(policy_id = %policy.policy_id, error = %failure, "policy resolution failed");
                policy.transition(
                    StageStatus::Failed,
                    Stage::Resolve,
                    self.clock.now(),
                    failure.to_string(),
                )?;
            }
        }
        self.persist(policy)?;
        Ok(())
    }

    /// Activates a resolved policy, re-resolving first when the inventory changed.
    fn activate(
        &self,
        policy: &mut Policy,
        snapshot: &InventorySnapshot,
    ) -> Result<(), PipelineError> {
        let drifted = policy.resolved_against != Some(snapshot.captured_at);
        let result = match resolve(policy, snapshot) {
            Ok(resolved) => ActivationEngine::new(&self.connector).activate(&resolved),
            Err(failure) => {
                warn!(
                    policy_id = %policy.policy_id,
                    error = %failure,
                    drifted,
                    "policy no longer resolves; activation aborted"
                );
                let message = if drifted {
                    format!("inventory changed since resolution; {failure}")
                } else {
                    failure.to_string()
                };
                policy.transition(StageStatus::Failed, Stage::Resolve, self.clock.now(), message)?;
                self.persist(policy)?;
                return Ok(());
            }
        };

        if drifted {
            policy.resolved_against = Some(snapshot.captured_at);
            policy.note(
                Stage::Resolve,
                self.clock.now(),
                format!("re-resolved against inventory captured at {}", snapshot.captured_at),
            );
        }
        let summary = result.summary();
        policy.activation = result.steps;
        policy.transition(result.status, Stage::Activate, self.clock.now(), summary)?;
        info!(policy_id = %policy.policy_id, status = %policy.status, "activation finished");
        self.persist(policy)?;
        Ok(())
    }

    /// Assures an activated policy.
    fn assure(&self, policy: &mut Policy, snapshot: &InventorySnapshot) -> Result<(), PipelineError> {
        let result = AssuranceEngine::new(&self.connector)
            .assure(&ActivatedPolicy::from_record(policy, snapshot));
        policy.assurance = result.steps;
        policy.transition(result.status, Stage::Assure, self.clock.now(), result.explanation)?;
        info!(policy_id = %policy.policy_id, status = %policy.status, "assurance finished");
        self.persist(policy)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Rewrites the store file with `policy` upserted.
    fn persist(&self, policy: &Policy) -> Result<(), StoreError> {
        let mut file = self.store.load()?;
        file.upsert(policy.clone());
        self.store.save(&file)
    }
}

/// Maps a terminal status onto a run disposition.
const fn terminal_disposition(status: StageStatus) -> RunDisposition {
    match status {
        StageStatus::Assured => RunDisposition::Assured,
        _ => RunDisposition::Failed,
    }
}
