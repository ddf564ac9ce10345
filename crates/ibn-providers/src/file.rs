// crates/ibn-providers/src/file.rs
// ============================================================================
// Module: File Sources
// Description: YAML topology provider and YAML steps translator.
// Purpose: Run the pipeline offline against hand-maintained lab descriptions
// and step lists produced outside the pipeline.
// Dependencies: ibn-core, serde, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! Both sources re-read their file on every call so edits are picked up by the
//! next run. Files are size-limited and must be UTF-8 YAML.
//!
//! A topology file looks like:
//!
//! ```yaml
//! topology: ibn-lab
//! devices:
//!   - name: fw1
//!     role: firewall
//!     console: { host: 0.0.0.0, port: 5000 }
//! links:
//!   - a: { device: fw1, interface: Ethernet0 }
//!     b: { device: r1, interface: Ethernet0 }
//! ```
//!
//! A steps file is either a bare list of steps or a map with a `steps` key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use ibn_core::Device;
use ibn_core::Link;
use ibn_core::PolicyStep;
use ibn_core::ProviderError;
use ibn_core::TopologyListing;
use ibn_core::TopologyProvider;
use ibn_core::TranslateError;
use ibn_core::TranslationContext;
use ibn_core::Translator;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a topology or steps file.
pub const MAX_SOURCE_FILE_BYTES: u64 = 1024 * 1024;

/// Reads a UTF-8 file, rejecting anything above [`MAX_SOURCE_FILE_BYTES`].
fn read_source_file(path: &Path) -> Result<String, String> {
    let file = File::open(path).map_err(|err| format!("cannot open {}: {err}", path.display()))?;
    let mut bytes = Vec::new();
    file.take(MAX_SOURCE_FILE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_SOURCE_FILE_BYTES {
        return Err(format!("{} exceeds {MAX_SOURCE_FILE_BYTES} bytes", path.display()));
    }
    String::from_utf8(bytes).map_err(|_| format!("{} is not valid UTF-8", path.display()))
}

// ============================================================================
// SECTION: Topology File
// ============================================================================

/// On-disk shape of a topology file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyFile {
    /// Topology name.
    #[serde(default)]
    topology: Option<String>,
    /// Devices.
    #[serde(default)]
    devices: Vec<Device>,
    /// Links.
    #[serde(default)]
    links: Vec<Link>,
}

/// Topology provider reading a YAML lab description.
#[derive(Debug, Clone)]
pub struct FileTopologyProvider {
    /// Topology file path.
    path: PathBuf,
}

impl FileTopologyProvider {
    /// Creates a provider for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Loads and parses the topology file.
    fn load(&self) -> Result<TopologyFile, ProviderError> {
        let text = read_source_file(&self.path).map_err(ProviderError::Unavailable)?;
        serde_yaml::from_str(&text).map_err(|err| {
            ProviderError::InvalidResponse(format!("{}: {err}", self.path.display()))
        })
    }
}

impl TopologyProvider for FileTopologyProvider {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        Ok(self.load()?.devices)
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        Ok(self.load()?.links)
    }

    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        let file = self.load()?;
        Ok(TopologyListing {
            devices: file.devices,
            links: file.links,
        })
    }

    fn topology_name(&self) -> Option<String> {
        match self.load() {
            Ok(file) => file.topology,
            Err(err) => {
                warn!(error = %err, "topology name unavailable");
                None
            }
        }
    }
}

// ============================================================================
// SECTION: Steps File
// ============================================================================

/// Accepted on-disk shapes of a steps file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepsFile {
    /// Bare list of steps.
    List(Vec<PolicyStep>),
    /// Map with a `steps` key.
    Wrapped {
        /// Steps.
        steps: Vec<PolicyStep>,
    },
}

/// Translator that returns the steps written in a YAML file.
#[derive(Debug, Clone)]
pub struct StepsFileTranslator {
    /// Steps file path.
    path: PathBuf,
}

impl StepsFileTranslator {
    /// Creates a translator for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }
}

impl Translator for StepsFileTranslator {
    fn translate(
        &self,
        intent: &str,
        context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError> {
        let text = read_source_file(&self.path).map_err(TranslateError::Unavailable)?;
        let file: StepsFile = serde_yaml::from_str(&text)
            .map_err(|err| TranslateError::Invalid(format!("{}: {err}", self.path.display())))?;
        let steps = match file {
            StepsFile::List(steps)
            | StepsFile::Wrapped {
                steps,
            } => steps,
        };
        for step in &steps {
            if !context.devices.iter().any(|device| device.name == step.device) {
                warn!(device = %step.device, "step targets a device outside the inventory");
            }
        }
        debug!(intent, steps = steps.len(), path = %self.path.display(), "steps loaded");
        Ok(steps)
    }
}
