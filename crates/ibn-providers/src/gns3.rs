// crates/ibn-providers/src/gns3.rs
// ============================================================================
// Module: GNS3 Topology Provider
// Description: Topology provider backed by the GNS3 v2 REST API.
// Purpose: Capture devices, console ports, and links from a running lab project.
// Dependencies: ibn-core, reqwest, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! The provider resolves the configured project by name, then lists its nodes
//! and links. A full capture reads the project list, the nodes, and the links
//! once each, so link endpoints always refer to the listed nodes. Nodes become
//! devices with a role derived from the node type and a console endpoint when
//! the platform reports one. Link endpoints are named from each node's port
//! table, falling back to `adapter/port`.
//!
//! Requests are blocking, bounded by a timeout, and response bodies are read
//! with a hard size limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use ibn_core::Device;
use ibn_core::DeviceName;
use ibn_core::DeviceRole;
use ibn_core::Endpoint;
use ibn_core::Link;
use ibn_core::LinkEndpoint;
use ibn_core::ProviderError;
use ibn_core::TopologyListing;
use ibn_core::TopologyProvider;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the GNS3 provider.
///
/// # Invariants
/// - `max_response_bytes` is enforced as a hard upper bound on response bodies.
/// - `timeout_ms` applies to the full request lifecycle.
/// - Basic auth is sent only when `username` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gns3Config {
    /// Platform host name or address.
    pub host: String,
    /// Platform REST port.
    pub port: u16,
    /// Optional basic-auth user.
    pub username: Option<String>,
    /// Optional basic-auth password.
    pub password: Option<String>,
    /// Project (topology) name.
    pub project: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
}

impl Default for Gns3Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3080,
            username: None,
            password: None,
            project: String::new(),
            timeout_ms: 30_000,
            max_response_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Gns3Config {
    /// Returns the API base URL, e.g. `http://127.0.0.1:3080/v2`.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}/v2", self.host, self.port)
        } else {
            format!("http://{}:{}/v2", self.host, self.port)
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Project summary from `GET /projects`.
#[derive(Debug, Deserialize)]
struct ProjectRecord {
    /// Project identifier.
    project_id: String,
    /// Project name.
    name: String,
}

/// Node from `GET /projects/{id}/nodes`.
#[derive(Debug, Deserialize)]
struct NodeRecord {
    /// Node identifier.
    node_id: String,
    /// Node name.
    name: String,
    /// Emulator type.
    #[serde(default)]
    node_type: String,
    /// Console TCP port.
    #[serde(default)]
    console: Option<u16>,
    /// Console host binding.
    #[serde(default)]
    console_host: Option<String>,
    /// Port table.
    #[serde(default)]
    ports: Vec<PortRecord>,
}

/// Entry of a node's port table.
#[derive(Debug, Deserialize)]
struct PortRecord {
    /// Interface name.
    name: String,
    /// Adapter number.
    #[serde(default)]
    adapter_number: u32,
    /// Port number on the adapter.
    #[serde(default)]
    port_number: u32,
}

/// Link from `GET /projects/{id}/links`.
#[derive(Debug, Deserialize)]
struct LinkRecord {
    /// Link identifier.
    #[serde(default)]
    link_id: String,
    /// Attached node ports.
    #[serde(default)]
    nodes: Vec<LinkNodeRecord>,
}

/// One attachment of a link.
#[derive(Debug, Deserialize)]
struct LinkNodeRecord {
    /// Node identifier.
    node_id: String,
    /// Adapter number.
    #[serde(default)]
    adapter_number: u32,
    /// Port number on the adapter.
    #[serde(default)]
    port_number: u32,
}

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Topology provider for a GNS3 project.
pub struct Gns3Provider {
    /// Provider configuration.
    config: Gns3Config,
    /// HTTP client used for API requests.
    client: Client,
}

impl Gns3Provider {
    /// Creates a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the HTTP client cannot be created.
    pub fn new(config: Gns3Config) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent("ibn-pipeline/0.1")
            .build()
            .map_err(|err| ProviderError::Unavailable(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Issues an authenticated GET and decodes the JSON body.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.config.base_url());
        let mut request = self.client.get(&url);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        let mut response = request
            .send()
            .map_err(|err| ProviderError::Unavailable(format!("GET {path} failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("GET {path} returned {status}")));
        }
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        debug!(path, bytes = body.len(), "platform response received");
        serde_json::from_slice(&body)
            .map_err(|err| ProviderError::InvalidResponse(format!("GET {path}: {err}")))
    }

    /// Resolves the configured project name to its identifier.
    fn project_id(&self) -> Result<String, ProviderError> {
        let projects: Vec<ProjectRecord> = self.get_json("/projects")?;
        projects
            .into_iter()
            .find(|project| project.name == self.config.project)
            .map(|project| project.project_id)
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "project '{}' not found on the platform",
                    self.config.project
                ))
            })
    }

    /// Lists the raw nodes of the project.
    fn nodes(&self, project_id: &str) -> Result<Vec<NodeRecord>, ProviderError> {
        self.get_json(&format!("/projects/{project_id}/nodes"))
    }

    /// Lists the project's links, naming endpoints from `nodes`.
    fn links(&self, project_id: &str, nodes: &[NodeRecord]) -> Result<Vec<Link>, ProviderError> {
        let by_id: BTreeMap<&str, &NodeRecord> =
            nodes.iter().map(|node| (node.node_id.as_str(), node)).collect();
        let records: Vec<LinkRecord> = self.get_json(&format!("/projects/{project_id}/links"))?;

        records
            .iter()
            .map(|record| {
                let [a, b] = record.nodes.as_slice() else {
                    return Err(ProviderError::InvalidResponse(format!(
                        "link {} does not join exactly two nodes",
                        record.link_id
                    )));
                };
                Ok(Link {
                    a: link_endpoint(&by_id, a)?,
                    b: link_endpoint(&by_id, b)?,
                })
            })
            .collect()
    }

    /// Converts a node record into a device.
    fn device_from(&self, node: &NodeRecord) -> Device {
        let console = node.console.map(|port| {
            let host = node
                .console_host
                .as_deref()
                .filter(|host| !host.trim().is_empty())
                .unwrap_or(&self.config.host);
            Endpoint::new(host, port)
        });
        Device {
            name: DeviceName::new(node.name.clone()),
            console,
            role: role_for(&node.node_type, &node.name),
            interfaces: node.ports.iter().map(|port| port.name.clone()).collect(),
        }
    }
}

impl TopologyProvider for Gns3Provider {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        let project_id = self.project_id()?;
        let nodes = self.nodes(&project_id)?;
        Ok(nodes.iter().map(|node| self.device_from(node)).collect())
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        let project_id = self.project_id()?;
        let nodes = self.nodes(&project_id)?;
        self.links(&project_id, &nodes)
    }

    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        let project_id = self.project_id()?;
        let nodes = self.nodes(&project_id)?;
        let links = self.links(&project_id, &nodes)?;
        Ok(TopologyListing {
            devices: nodes.iter().map(|node| self.device_from(node)).collect(),
            links,
        })
    }

    fn topology_name(&self) -> Option<String> {
        Some(self.config.project.clone())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Derives a device role from the emulator type and the node name.
#[must_use]
pub fn role_for(node_type: &str, name: &str) -> DeviceRole {
    let lowered = name.to_ascii_lowercase();
    let firewall_name =
        lowered.starts_with("fw") || lowered.contains("firewall") || lowered.contains("asa");
    match node_type {
        "vpcs" => DeviceRole::Workstation,
        "ethernet_switch" | "ethernet_hub" => DeviceRole::Switch,
        "cloud" | "nat" => DeviceRole::Cloud,
        "qemu" | "dynamips" | "iou" | "docker" if firewall_name => DeviceRole::Firewall,
        "qemu" | "dynamips" | "iou" | "docker" => DeviceRole::Router,
        _ if firewall_name => DeviceRole::Firewall,
        _ => DeviceRole::Unknown,
    }
}

/// Names one side of a link from the owning node's port table.
fn link_endpoint(
    nodes: &BTreeMap<&str, &NodeRecord>,
    attachment: &LinkNodeRecord,
) -> Result<LinkEndpoint, ProviderError> {
    let node = nodes.get(attachment.node_id.as_str()).ok_or_else(|| {
        ProviderError::InvalidResponse(format!(
            "link references unknown node {}",
            attachment.node_id
        ))
    })?;
    let interface = node
        .ports
        .iter()
        .find(|port| {
            port.adapter_number == attachment.adapter_number
                && port.port_number == attachment.port_number
        })
        .map_or_else(
            || format!("{}/{}", attachment.adapter_number, attachment.port_number),
            |port| port.name.clone(),
        );
    Ok(LinkEndpoint {
        device: DeviceName::new(node.name.clone()),
        interface,
    })
}

/// Reads a response body while enforcing a hard size limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ProviderError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ProviderError::InvalidResponse("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ProviderError::InvalidResponse("platform response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| ProviderError::Unavailable(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ProviderError::InvalidResponse("platform response exceeds size limit".to_string()));
    }
    Ok(buf)
}
