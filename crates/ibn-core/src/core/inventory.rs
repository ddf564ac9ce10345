// crates/ibn-core/src/core/inventory.rs
// ============================================================================
// Module: IBN Inventory Model
// Description: Devices, console endpoints, links, and inventory snapshots.
// Purpose: Capture a point-in-time, read-only view of the lab topology.
// Dependencies: crate::core::{identifiers, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! An [`InventorySnapshot`] is created whole by a refresh and replaced whole by
//! the next one. Nothing in the pipeline mutates a snapshot after capture; the
//! resolver, activation, and assurance stages only read it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::DeviceName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Endpoints
// ============================================================================

/// Hosts that mean "any address" rather than a routable console host.
const WILDCARD_HOSTS: &[&str] = &["", "0.0.0.0", "::", "[::]", "*"];

/// Management console endpoint for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Console host name or address.
    pub host: String,
    /// Console TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns true when the host is a wildcard/any-address binding.
    #[must_use]
    pub fn is_wildcard_host(&self) -> bool {
        WILDCARD_HOSTS.contains(&self.host.trim())
    }

    /// Returns the endpoint to dial, substituting `platform_host` for wildcard hosts.
    ///
    /// Console ports are platform-relative, so a device advertising `0.0.0.0`
    /// is reached through the virtualization host instead.
    #[must_use]
    pub fn resolve_against(&self, platform_host: &str) -> Self {
        if self.is_wildcard_host() {
            Self::new(platform_host, self.port)
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ============================================================================
// SECTION: Devices and Links
// ============================================================================

/// Role tag for a captured device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Packet filtering device.
    Firewall,
    /// Layer-3 router.
    Router,
    /// Layer-2 switch or hub.
    Switch,
    /// End host (VPCS, desktop image).
    Workstation,
    /// Cloud/NAT attachment point.
    Cloud,
    /// Role could not be derived.
    #[default]
    Unknown,
}

impl DeviceRole {
    /// Returns a stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Firewall => "firewall",
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Workstation => "workstation",
            Self::Cloud => "cloud",
            Self::Unknown => "unknown",
        }
    }
}

/// Device captured in an inventory snapshot.
///
/// # Invariants
/// - `name` is unique within the snapshot that owns the device.
/// - `console` is `None` when the provider did not report a console port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device name.
    pub name: DeviceName,
    /// Management console endpoint.
    #[serde(default)]
    pub console: Option<Endpoint>,
    /// Role tag.
    #[serde(default)]
    pub role: DeviceRole,
    /// Interface names reported by the provider.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    /// Device name.
    pub device: DeviceName,
    /// Interface name on the device.
    pub interface: String,
}

/// Unordered pair of device interfaces joined by a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// First endpoint.
    pub a: LinkEndpoint,
    /// Second endpoint.
    pub b: LinkEndpoint,
}

impl Link {
    /// Returns true when the link joins `first` and `second`, in either order.
    #[must_use]
    pub fn connects(&self, first: &DeviceName, second: &DeviceName) -> bool {
        (&self.a.device == first && &self.b.device == second)
            || (&self.a.device == second && &self.b.device == first)
    }

    /// Returns true when either endpoint is on `device`.
    #[must_use]
    pub fn touches(&self, device: &DeviceName) -> bool {
        &self.a.device == device || &self.b.device == device
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Error raised when a device list contains the same name twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate device name in topology: {0}")]
pub struct DuplicateDeviceError(pub DeviceName);

/// Point-in-time view of reachable devices and link topology.
///
/// # Invariants
/// - Map keys equal the `name` of the device they index.
/// - Never partially mutated; a refresh replaces the snapshot in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Topology (project) name the snapshot was captured from.
    #[serde(default)]
    pub topology: Option<String>,
    /// Capture timestamp.
    pub captured_at: Timestamp,
    /// Devices keyed by name.
    pub devices: BTreeMap<DeviceName, Device>,
    /// Link table.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl InventorySnapshot {
    /// Builds a snapshot from provider output.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateDeviceError`] when two devices share a name.
    pub fn from_parts(
        topology: Option<String>,
        captured_at: Timestamp,
        devices: Vec<Device>,
        links: Vec<Link>,
    ) -> Result<Self, DuplicateDeviceError> {
        let mut table = BTreeMap::new();
        for device in devices {
            let name = device.name.clone();
            if table.insert(name.clone(), device).is_some() {
                return Err(DuplicateDeviceError(name));
            }
        }
        Ok(Self {
            topology,
            captured_at,
            devices: table,
            links,
        })
    }

    /// Looks up a device by name.
    #[must_use]
    pub fn device(&self, name: &DeviceName) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Returns true when the snapshot contains `name`.
    #[must_use]
    pub fn contains(&self, name: &DeviceName) -> bool {
        self.devices.contains_key(name)
    }

    /// Returns the links touching `device`.
    pub fn links_of<'a>(&'a self, device: &'a DeviceName) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |link| link.touches(device))
    }
}
