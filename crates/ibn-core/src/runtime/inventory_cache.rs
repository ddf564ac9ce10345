// crates/ibn-core/src/runtime/inventory_cache.rs
// ============================================================================
// Module: Inventory Cache
// Description: On-demand topology capture backed by a durable snapshot.
// Purpose: Ground translation and resolution in real topology data without
// re-querying the provider on every stage.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! [`InventoryCache::refresh`] reads devices and links from the provider in one
//! [`TopologyProvider::list_topology`] call, builds a complete
//! [`InventorySnapshot`], and only then hands it to the repository. Any failure before the save leaves the stored snapshot intact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;

use crate::core::InventorySnapshot;
use crate::interfaces::Clock;
use crate::interfaces::InventoryError;
use crate::interfaces::InventoryRepository;
use crate::interfaces::InventorySource;
use crate::interfaces::TopologyProvider;

// ============================================================================
// SECTION: Inventory Cache
// ============================================================================

/// Inventory cache combining a provider, a snapshot repository, and a clock.
pub struct InventoryCache<P, R, K> {
    /// Topology provider queried on refresh.
    provider: P,
    /// Durable snapshot repository.
    repository: R,
    /// Clock stamping captures.
    clock: K,
}

impl<P, R, K> InventoryCache<P, R, K>
where
    P: TopologyProvider,
    R: InventoryRepository,
    K: Clock,
{
    /// Creates a new inventory cache.
    pub const fn new(provider: P, repository: R, clock: K) -> Self {
        Self {
            provider,
            repository,
            clock,
        }
    }

    /// Captures a snapshot from the provider without persisting it.
    fn capture(&self) -> Result<InventorySnapshot, InventoryError> {
        let listing = self.provider.list_topology()?;
        let snapshot = InventorySnapshot::from_parts(
            self.provider.topology_name(),
            self.clock.now(),
            listing.devices,
            listing.links,
        )?;
        Ok(snapshot)
    }
}

impl<P, R, K> InventorySource for InventoryCache<P, R, K>
where
    P: TopologyProvider,
    R: InventoryRepository,
    K: Clock,
{
    fn refresh(&self) -> Result<InventorySnapshot, InventoryError> {
        let snapshot = self.capture().inspect_err(|err| {
            warn!(error = %err, "inventory refresh failed; keeping previous snapshot");
        })?;
        self.repository.save(&snapshot)?;
        info!(
            devices = snapshot.devices.len(),
            links = snapshot.links.len(),
            captured_at = %snapshot.captured_at,
            "inventory refreshed"
        );
        Ok(snapshot)
    }

    fn current(&self) -> Result<InventorySnapshot, InventoryError> {
        self.repository.load()?.ok_or(InventoryError::NoInventory)
    }
}
