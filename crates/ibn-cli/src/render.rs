// crates/ibn-cli/src/render.rs
// ============================================================================
// Module: Report Rendering
// Description: Plain-text views of inventory snapshots and policies.
// Purpose: Produce the human-readable output of `inventory show` and
// `policy show`.
// Dependencies: ibn-core
// ============================================================================

//! ## Overview
//! Renderers return owned strings and never write to a stream, so the binary
//! decides where output goes. Machine-readable output uses the store formats
//! directly (JSON for inventory, YAML for policies).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use ibn_core::InventorySnapshot;
use ibn_core::Policy;
use ibn_core::StepActivationStatus;

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Renders an inventory snapshot as an indented text report.
#[must_use]
pub fn render_inventory(snapshot: &InventorySnapshot) -> String {
    let mut out = String::new();
    let topology = snapshot.topology.as_deref().unwrap_or("-");
    let _ = writeln!(out, "topology: {topology}");
    let _ = writeln!(out, "captured_at: {}", snapshot.captured_at);
    let _ = writeln!(out, "devices: {}", snapshot.devices.len());
    for device in snapshot.devices.values() {
        let console =
            device.console.as_ref().map_or_else(|| "none".to_string(), ToString::to_string);
        let _ = writeln!(out, "  {} [{}] console {console}", device.name, device.role.as_str());
        if !device.interfaces.is_empty() {
            let _ = writeln!(out, "    interfaces: {}", device.interfaces.join(", "));
        }
    }
    let _ = writeln!(out, "links: {}", snapshot.links.len());
    for link in &snapshot.links {
        let _ = writeln!(
            out,
            "  {}:{} <-> {}:{}",
            link.a.device, link.a.interface, link.b.device, link.b.interface
        );
    }
    out
}

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Renders the one-line summary used by `policy list`.
#[must_use]
pub fn render_policy_line(policy: &Policy) -> String {
    let intent = policy.intent.lines().next().unwrap_or_default();
    format!("{}\t{}\t{intent}", policy.policy_id, policy.status)
}

/// Renders a policy with its steps, stage results, and log.
#[must_use]
pub fn render_policy(policy: &Policy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "policy: {}", policy.policy_id);
    let _ = writeln!(out, "status: {}", policy.status);
    let _ = writeln!(out, "intent: {}", policy.intent);
    if let Some(at) = &policy.resolved_against {
        let _ = writeln!(out, "resolved_against: {at}");
    }

    let _ = writeln!(out, "steps: {}", policy.steps.len());
    for (index, step) in policy.steps.iter().enumerate() {
        let description = step.description.as_deref().unwrap_or("");
        let _ = writeln!(out, "  [{index}] {} {description}", step.device);
        for command in &step.enforcement {
            let _ = writeln!(out, "      enforce: {command}");
        }
        for command in &step.validation {
            let _ = writeln!(out, "      validate: {command}");
        }
        for criterion in &step.criteria {
            let _ = writeln!(out, "      expect: {criterion}");
        }
    }

    if !policy.activation.is_empty() {
        let _ = writeln!(out, "activation:");
        for record in &policy.activation {
            let status = match record.status {
                StepActivationStatus::Activated => "activated",
                StepActivationStatus::Failed => "failed",
            };
            let _ = write!(out, "  [{}] {} {status}", record.step_index, record.device);
            if let Some(error) = &record.error {
                let _ = write!(out, ": {error}");
            }
            out.push('\n');
        }
    }

    if !policy.assurance.is_empty() {
        let _ = writeln!(out, "assurance:");
        for record in &policy.assurance {
            let _ = write!(
                out,
                "  [{}] {} {}",
                record.step_index,
                record.device,
                record.verdict.as_str()
            );
            if let Some(error) = &record.error {
                let _ = write!(out, ": {error}");
            }
            out.push('\n');
            for criterion in &record.unmatched {
                let _ = writeln!(out, "      unmatched: {criterion}");
            }
        }
    }

    let _ = writeln!(out, "log:");
    for entry in &policy.log {
        let _ = writeln!(
            out,
            "  #{} {} {} {}: {}",
            entry.seq, entry.at, entry.stage, entry.status, entry.message
        );
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
