// crates/ibn-core/src/runtime/batch.rs
// ============================================================================
// Module: Command Batches
// Description: Open-send-close helper shared by activation and assurance.
// Purpose: Guarantee a session is closed on every exit path of a stage step.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! A batch opens one session to one device, sends the commands, and always
//! closes the session before returning. Sessions never outlive the step that
//! opened them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;
use tracing::warn;

use crate::core::DeviceName;
use crate::core::InventorySnapshot;
use crate::interfaces::CommandSession;
use crate::interfaces::SessionConnector;
use crate::interfaces::SessionError;

// ============================================================================
// SECTION: Batch Execution
// ============================================================================

/// Runs `commands` on `device` through a fresh session.
///
/// A close failure after a successful send is logged and does not discard the
/// captured output.
pub(crate) fn run_batch<C: SessionConnector + ?Sized>(
    connector: &C,
    inventory: &InventorySnapshot,
    device: &DeviceName,
    commands: &[String],
) -> Result<String, SessionError> {
    let endpoint = inventory
        .device(device)
        .ok_or_else(|| {
            SessionError::Connection(format!("device '{device}' is not present in the inventory"))
        })?
        .console
        .as_ref()
        .ok_or_else(|| SessionError::Connection(format!("device '{device}' has no console endpoint")))?;

    debug!(device = %device, endpoint = %endpoint, commands = commands.len(), "opening session");
    let mut session = connector.open(endpoint)?;
    let sent = session.send(commands);
    if let Err(err) = session.close() {
        warn!(device = %device, error = %err, "session close failed");
    }
    sent
}
