// crates/ibn-cli/src/source.rs
// ============================================================================
// Module: Topology Source Selection
// Description: Chooses between a topology file and the lab platform.
// Purpose: Give the inventory cache one provider type whatever the source.
// Dependencies: ibn-core, ibn-providers
// ============================================================================

//! ## Overview
//! A topology file wins when one is named. Otherwise the platform is used,
//! and when the platform is not configured the source still exists but every
//! query fails as unavailable, so commands that never refresh keep working.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use ibn_core::Device;
use ibn_core::Link;
use ibn_core::ProviderError;
use ibn_core::TopologyListing;
use ibn_core::TopologyProvider;
use ibn_providers::FileTopologyProvider;
use ibn_providers::Gns3Config;
use ibn_providers::Gns3Provider;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Topology provider selected from command-line and config inputs.
pub enum TopologySource {
    /// YAML lab description.
    File(FileTopologyProvider),
    /// GNS3 REST API.
    Platform(Box<Gns3Provider>),
    /// No usable source; carries the reason.
    Unconfigured(String),
}

impl TopologySource {
    /// Selects the file source when `file` is set, else the platform.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the platform HTTP client cannot be built.
    pub fn select(
        file: Option<PathBuf>,
        platform: Result<Gns3Config, String>,
    ) -> Result<Self, ProviderError> {
        if let Some(path) = file {
            return Ok(Self::File(FileTopologyProvider::new(path)));
        }
        match platform {
            Ok(config) => Ok(Self::Platform(Box::new(Gns3Provider::new(config)?))),
            Err(reason) => Ok(Self::Unconfigured(reason)),
        }
    }

    /// Returns a short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Platform(_) => "platform",
            Self::Unconfigured(_) => "unconfigured",
        }
    }
}

impl TopologyProvider for TopologySource {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        match self {
            Self::File(provider) => provider.list_devices(),
            Self::Platform(provider) => provider.list_devices(),
            Self::Unconfigured(reason) => Err(ProviderError::Unavailable(reason.clone())),
        }
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        match self {
            Self::File(provider) => provider.list_links(),
            Self::Platform(provider) => provider.list_links(),
            Self::Unconfigured(reason) => Err(ProviderError::Unavailable(reason.clone())),
        }
    }

    fn topology_name(&self) -> Option<String> {
        match self {
            Self::File(provider) => provider.topology_name(),
            Self::Platform(provider) => provider.topology_name(),
            Self::Unconfigured(_) => None,
        }
    }

    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        match self {
            Self::File(provider) => provider.list_topology(),
            Self::Platform(provider) => provider.list_topology(),
            Self::Unconfigured(reason) => Err(ProviderError::Unavailable(reason.clone())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
