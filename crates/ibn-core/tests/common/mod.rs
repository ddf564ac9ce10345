// crates/ibn-core/tests/common/mod.rs
// ============================================================================
// Module: Pipeline Test Helpers
// Description: Fake devices, translators, providers, and sample inventories.
// ============================================================================
//! ## Overview
//! Shared doubles for the integration tests. The echo device remembers every
//! command it has received and answers each batch with that running history,
//! so a validation batch sees the configuration pushed during activation.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared test helpers; not every test binary uses every helper."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use ibn_core::CommandSession;
use ibn_core::Device;
use ibn_core::DeviceName;
use ibn_core::DeviceRole;
use ibn_core::Endpoint;
use ibn_core::InventorySnapshot;
use ibn_core::Link;
use ibn_core::LinkEndpoint;
use ibn_core::Policy;
use ibn_core::PolicyId;
use ibn_core::PolicyStep;
use ibn_core::ProviderError;
use ibn_core::SessionConnector;
use ibn_core::SessionError;
use ibn_core::SuccessCriterion;
use ibn_core::Timestamp;
use ibn_core::TopologyProvider;
use ibn_core::TranslateError;
use ibn_core::TranslationContext;
use ibn_core::Translator;

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Console port of `fw1` in the sample inventory.
pub const FW1_PORT: u16 = 5000;
/// Console port of `r1` in the sample inventory.
pub const R1_PORT: u16 = 5001;
/// Console port of `pc1` in the sample inventory.
pub const PC1_PORT: u16 = 5002;

/// Builds a device with an optional console port on the wildcard host.
pub fn device(name: &str, port: Option<u16>, role: DeviceRole) -> Device {
    Device {
        name: DeviceName::new(name),
        console: port.map(|port| Endpoint::new("0.0.0.0", port)),
        role,
        interfaces: vec!["Ethernet0".to_string(), "Ethernet1".to_string()],
    }
}

/// Devices of the sample lab; `sw1` has no console endpoint.
pub fn sample_devices() -> Vec<Device> {
    vec![
        device("fw1", Some(FW1_PORT), DeviceRole::Firewall),
        device("r1", Some(R1_PORT), DeviceRole::Router),
        device("pc1", Some(PC1_PORT), DeviceRole::Workstation),
        device("sw1", None, DeviceRole::Switch),
    ]
}

/// Links of the sample lab.
pub fn sample_links() -> Vec<Link> {
    vec![
        link("fw1", "Ethernet0", "r1", "Ethernet0"),
        link("r1", "Ethernet1", "sw1", "Ethernet0"),
        link("sw1", "Ethernet1", "pc1", "Ethernet0"),
    ]
}

/// Builds a link between two device interfaces.
pub fn link(a: &str, a_if: &str, b: &str, b_if: &str) -> Link {
    Link {
        a: LinkEndpoint {
            device: DeviceName::new(a),
            interface: a_if.to_string(),
        },
        b: LinkEndpoint {
            device: DeviceName::new(b),
            interface: b_if.to_string(),
        },
    }
}

/// Sample snapshot captured at logical time `tick`.
pub fn sample_inventory(tick: u64) -> InventorySnapshot {
    InventorySnapshot::from_parts(
        Some("ibn-lab".to_string()),
        Timestamp::Logical(tick),
        sample_devices(),
        sample_links(),
    )
    .unwrap()
}

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Step pushing `deny ip any any` to `fw1` and checking for `criterion`.
pub fn fw1_step(criterion: &str) -> PolicyStep {
    PolicyStep {
        device: DeviceName::new("fw1"),
        description: Some("block all IP traffic on fw1".to_string()),
        enforcement: vec!["configure terminal".to_string(), "deny ip any any".to_string()],
        validation: vec!["show access-lists".to_string()],
        criteria: vec![SuccessCriterion::substring(criterion)],
    }
}

/// Generic step for `device` whose enforcement is `command`.
pub fn step(device: &str, command: &str) -> PolicyStep {
    PolicyStep {
        device: DeviceName::new(device),
        description: None,
        enforcement: vec![command.to_string()],
        validation: vec!["show running-config".to_string()],
        criteria: vec![SuccessCriterion::substring(command)],
    }
}

/// Draft policy with the given steps.
pub fn policy_with_steps(id: &str, steps: Vec<PolicyStep>) -> Policy {
    let mut policy = Policy::draft(PolicyId::new(id), "block all traffic through fw1");
    policy.steps = steps;
    policy
}

// ============================================================================
// SECTION: Echo Devices
// ============================================================================

/// Session lifecycle event observed by the echo connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session opened to the given port.
    Opened(u16),
    /// Commands sent on the given port.
    Sent(u16, Vec<String>),
    /// Session on the given port closed.
    Closed(u16),
}

#[derive(Debug, Default)]
struct EchoState {
    history: BTreeMap<u16, Vec<String>>,
    events: Vec<SessionEvent>,
}

/// Connector to fake devices that answer with their full command history.
#[derive(Debug, Clone, Default)]
pub struct EchoConnector {
    unreachable: BTreeSet<u16>,
    state: Arc<Mutex<EchoState>>,
}

impl EchoConnector {
    /// Creates a connector where every port is reachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector refusing connections on `ports`.
    pub fn unreachable(ports: &[u16]) -> Self {
        Self {
            unreachable: ports.iter().copied().collect(),
            state: Arc::default(),
        }
    }

    /// Returns every recorded session event.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Returns the number of sessions opened.
    pub fn open_count(&self) -> usize {
        self.events().iter().filter(|event| matches!(event, SessionEvent::Opened(_))).count()
    }

    /// Returns the number of sessions closed.
    pub fn close_count(&self) -> usize {
        self.events().iter().filter(|event| matches!(event, SessionEvent::Closed(_))).count()
    }

    /// Returns the commands a port has received.
    pub fn history(&self, port: u16) -> Vec<String> {
        self.state.lock().unwrap().history.get(&port).cloned().unwrap_or_default()
    }
}

impl SessionConnector for EchoConnector {
    type Session = EchoSession;

    fn open(&self, endpoint: &Endpoint) -> Result<EchoSession, SessionError> {
        if self.unreachable.contains(&endpoint.port) {
            return Err(SessionError::Connection(format!("connection refused by {endpoint}")));
        }
        self.state.lock().unwrap().events.push(SessionEvent::Opened(endpoint.port));
        Ok(EchoSession {
            port: endpoint.port,
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

/// Session on an echo device.
#[derive(Debug)]
pub struct EchoSession {
    port: u16,
    state: Arc<Mutex<EchoState>>,
    open: bool,
}

impl CommandSession for EchoSession {
    fn send(&mut self, commands: &[String]) -> Result<String, SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        let mut state = self.state.lock().unwrap();
        state.events.push(SessionEvent::Sent(self.port, commands.to_vec()));
        let history = state.history.entry(self.port).or_default();
        history.extend(commands.iter().cloned());
        Ok(history.join("\n"))
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if self.open {
            self.open = false;
            self.state.lock().unwrap().events.push(SessionEvent::Closed(self.port));
        }
        Ok(())
    }
}

/// Connector whose sessions open but break on every send.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenPipeConnector;

/// Session that fails every send.
#[derive(Debug)]
pub struct BrokenPipeSession;

impl SessionConnector for BrokenPipeConnector {
    type Session = BrokenPipeSession;

    fn open(&self, _endpoint: &Endpoint) -> Result<BrokenPipeSession, SessionError> {
        Ok(BrokenPipeSession)
    }
}

impl CommandSession for BrokenPipeSession {
    fn send(&mut self, _commands: &[String]) -> Result<String, SessionError> {
        Err(SessionError::Io("broken pipe".to_string()))
    }

    fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Connector whose consoles answer the first command of a batch and hang up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HangUpConnector;

/// Session that completes one command, then breaks.
#[derive(Debug)]
pub struct HangUpSession;

impl SessionConnector for HangUpConnector {
    type Session = HangUpSession;

    fn open(&self, _endpoint: &Endpoint) -> Result<HangUpSession, SessionError> {
        Ok(HangUpSession)
    }
}

impl CommandSession for HangUpSession {
    fn send(&mut self, commands: &[String]) -> Result<String, SessionError> {
        let Some((first, rest)) = commands.split_first() else {
            return Ok(String::new());
        };
        let output = format!("{first}\nfw1(config)#");
        if rest.is_empty() {
            return Ok(output);
        }
        Err(SessionError::Interrupted {
            reason: format!("console closed during command 2 of {}", commands.len()),
            output,
        })
    }

    fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Translators and Providers
// ============================================================================

/// Translator returning a fixed step list and recording the contexts it saw.
#[derive(Debug, Default)]
pub struct StaticTranslator {
    steps: Vec<PolicyStep>,
    fail: bool,
    seen: Mutex<Vec<TranslationContext>>,
}

impl StaticTranslator {
    /// Creates a translator returning `steps`.
    pub fn new(steps: Vec<PolicyStep>) -> Self {
        Self {
            steps,
            fail: false,
            seen: Mutex::default(),
        }
    }

    /// Creates a translator that always errors.
    pub fn failing() -> Self {
        Self {
            steps: Vec::new(),
            fail: true,
            seen: Mutex::default(),
        }
    }

    /// Returns the number of translate calls.
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Returns the last context handed to the translator.
    pub fn last_context(&self) -> Option<TranslationContext> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl Translator for StaticTranslator {
    fn translate(
        &self,
        _intent: &str,
        context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError> {
        self.seen.lock().unwrap().push(context.clone());
        if self.fail {
            return Err(TranslateError::Unavailable("model endpoint unreachable".to_string()));
        }
        Ok(self.steps.clone())
    }
}

/// Provider serving fixed devices and links, or failing when `down`.
#[derive(Debug, Default)]
pub struct StaticProvider {
    /// Devices to report.
    pub devices: Vec<Device>,
    /// Links to report.
    pub links: Vec<Link>,
    /// Simulate an unreachable platform.
    pub down: bool,
}

impl StaticProvider {
    /// Provider serving the sample lab.
    pub fn sample() -> Self {
        Self {
            devices: sample_devices(),
            links: sample_links(),
            down: false,
        }
    }

    /// Provider that is unreachable.
    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }
}

impl TopologyProvider for StaticProvider {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        if self.down {
            return Err(ProviderError::Unavailable("connection refused".to_string()));
        }
        Ok(self.devices.clone())
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        if self.down {
            return Err(ProviderError::Unavailable("connection refused".to_string()));
        }
        Ok(self.links.clone())
    }

    fn topology_name(&self) -> Option<String> {
        Some("ibn-lab".to_string())
    }
}
