// crates/ibn-core/src/interfaces/mod.rs
// ============================================================================
// Module: IBN Interfaces
// Description: Backend-agnostic interfaces for topology, translation, storage,
// device sessions, and time.
// Purpose: Define the contract surfaces used by the pipeline runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the pipeline integrates with external systems without
//! embedding backend details: the virtualization platform's REST API, the
//! language-model translator, the persisted files, and device consoles are all
//! reached through the traits below so tests can substitute in-memory doubles.
//!
//! Every call is synchronous and blocking; there is no hidden concurrency.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Device;
use crate::core::DeviceName;
use crate::core::DeviceRole;
use crate::core::DuplicateDeviceError;
use crate::core::Endpoint;
use crate::core::InventorySnapshot;
use crate::core::Link;
use crate::core::PolicyStep;
use crate::core::PolicyStoreFile;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Topology Provider
// ============================================================================

/// Topology provider errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or refused the request.
    #[error("topology provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered with data that could not be interpreted.
    #[error("topology provider returned invalid data: {0}")]
    InvalidResponse(String),
}

/// Devices and links read together from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologyListing {
    /// Devices in provider order.
    pub devices: Vec<Device>,
    /// Links in provider order.
    pub links: Vec<Link>,
}

/// Source of devices and links for a lab topology.
pub trait TopologyProvider {
    /// Lists every device in the topology.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be queried.
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError>;

    /// Lists every link in the topology.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be queried.
    fn list_links(&self) -> Result<Vec<Link>, ProviderError>;

    /// Returns the topology name, when the provider knows it.
    fn topology_name(&self) -> Option<String> {
        None
    }

    /// Lists devices and links for one capture.
    ///
    /// Providers that can read both from one listing override this so links
    /// never refer to a different device set than the devices returned.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be queried.
    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        Ok(TopologyListing {
            devices: self.list_devices()?,
            links: self.list_links()?,
        })
    }
}

impl<T: TopologyProvider + ?Sized> TopologyProvider for &T {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        (**self).list_devices()
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        (**self).list_links()
    }

    fn topology_name(&self) -> Option<String> {
        (**self).topology_name()
    }

    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        (**self).list_topology()
    }
}

impl<T: TopologyProvider + ?Sized> TopologyProvider for Box<T> {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        (**self).list_devices()
    }

    fn list_links(&self) -> Result<Vec<Link>, ProviderError> {
        (**self).list_links()
    }

    fn topology_name(&self) -> Option<String> {
        (**self).topology_name()
    }

    fn list_topology(&self) -> Result<TopologyListing, ProviderError> {
        (**self).list_topology()
    }
}

// ============================================================================
// SECTION: Inventory Access
// ============================================================================

/// Inventory cache errors.
///
/// # Invariants
/// - A failed refresh never replaces the previously cached snapshot.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The topology provider could not be reached.
    #[error("inventory refresh failed: {0}")]
    ProviderUnavailable(#[from] ProviderError),
    /// No snapshot has been captured yet.
    #[error("no inventory snapshot available; refresh the inventory first")]
    NoInventory,
    /// The provider reported the same device twice.
    #[error(transparent)]
    DuplicateDevice(#[from] DuplicateDeviceError),
    /// The snapshot could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Access to the cached inventory snapshot.
pub trait InventorySource {
    /// Captures a fresh snapshot and replaces the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when capture or persistence fails; the prior
    /// snapshot is left intact.
    fn refresh(&self) -> Result<InventorySnapshot, InventoryError>;

    /// Returns the last successfully captured snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NoInventory`] when none exists yet.
    fn current(&self) -> Result<InventorySnapshot, InventoryError>;
}

impl<T: InventorySource + ?Sized> InventorySource for &T {
    fn refresh(&self) -> Result<InventorySnapshot, InventoryError> {
        (**self).refresh()
    }

    fn current(&self) -> Result<InventorySnapshot, InventoryError> {
        (**self).current()
    }
}

// ============================================================================
// SECTION: Translator
// ============================================================================

/// Device summary handed to a translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Device name.
    pub name: DeviceName,
    /// Device role.
    pub role: DeviceRole,
}

/// Inventory-derived context for translation.
///
/// # Invariants
/// - Device names are exactly those of the snapshot the context was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationContext {
    /// Topology name.
    pub topology: Option<String>,
    /// Devices available as step targets.
    pub devices: Vec<DeviceSummary>,
    /// Link table.
    pub links: Vec<Link>,
}

impl TranslationContext {
    /// Builds a context from an inventory snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &InventorySnapshot) -> Self {
        Self {
            topology: snapshot.topology.clone(),
            devices: snapshot
                .devices
                .values()
                .map(|device| DeviceSummary {
                    name: device.name.clone(),
                    role: device.role,
                })
                .collect(),
            links: snapshot.links.clone(),
        }
    }
}

/// Translator errors.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Translator backend could not be reached or failed.
    #[error("translator unavailable: {0}")]
    Unavailable(String),
    /// Translator produced output that is not a step list.
    #[error("translator output invalid: {0}")]
    Invalid(String),
}

/// Converts intent text into a candidate ordered step list.
pub trait Translator {
    /// Translates `intent` using the inventory-derived `context`.
    ///
    /// An empty list means the translation produced nothing usable.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] when the translator fails.
    fn translate(
        &self,
        intent: &str,
        context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(
        &self,
        intent: &str,
        context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError> {
        (**self).translate(intent, context)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(
        &self,
        intent: &str,
        context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError> {
        (**self).translate(intent, context)
    }
}

/// Translator that never produces steps; policies wait for hand-written steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslator;

impl Translator for NoTranslator {
    fn translate(
        &self,
        _intent: &str,
        _context: &TranslationContext,
    ) -> Result<Vec<PolicyStep>, TranslateError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// SECTION: Repositories
// ============================================================================

/// Repository errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Stored data could not be parsed.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Stored data parsed but violates an invariant.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// Durable repository for the policy store file.
///
/// Loads and saves are always whole-file; there are no partial writes.
pub trait PolicyRepository {
    /// Loads every stored policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self) -> Result<PolicyStoreFile, StoreError>;

    /// Rewrites the stored file in full.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, file: &PolicyStoreFile) -> Result<(), StoreError>;
}

impl<T: PolicyRepository + ?Sized> PolicyRepository for &T {
    fn load(&self) -> Result<PolicyStoreFile, StoreError> {
        (**self).load()
    }

    fn save(&self, file: &PolicyStoreFile) -> Result<(), StoreError> {
        (**self).save(file)
    }
}

/// Durable repository for the inventory snapshot.
pub trait InventoryRepository {
    /// Loads the stored snapshot, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the stored snapshot cannot be read.
    fn load(&self) -> Result<Option<InventorySnapshot>, StoreError>;

    /// Replaces the stored snapshot in full.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), StoreError>;
}

impl<T: InventoryRepository + ?Sized> InventoryRepository for &T {
    fn load(&self) -> Result<Option<InventorySnapshot>, StoreError> {
        (**self).load()
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), StoreError> {
        (**self).save(snapshot)
    }
}

// ============================================================================
// SECTION: Command Sessions
// ============================================================================

/// Device session errors.
///
/// # Invariants
/// - `Connection` covers timeouts and refusals while opening a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The console could not be reached.
    #[error("connection error: {0}")]
    Connection(String),
    /// The session broke while sending or reading.
    #[error("session io error: {0}")]
    Io(String),
    /// The session was already closed.
    #[error("session closed")]
    Closed,
    /// The session broke partway through a batch.
    #[error("session interrupted: {reason}")]
    Interrupted {
        /// What broke and how far the batch got.
        reason: String,
        /// Output captured for the commands that completed.
        output: String,
    },
}

impl SessionError {
    /// Returns the output captured before the session broke, if any.
    #[must_use]
    pub fn partial_output(&self) -> &str {
        match self {
            Self::Interrupted {
                output, ..
            } => output,
            Self::Connection(_) | Self::Io(_) | Self::Closed => "",
        }
    }
}

/// Interactive line-oriented console session on one device.
pub trait CommandSession {
    /// Sends each command followed by a line terminator and returns the
    /// captured output.
    ///
    /// Capture is best-effort: slow or non-prompting devices may yield partial
    /// or empty output, which callers treat as an assurance signal. Every
    /// command must be written for the call to succeed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the session breaks. Once at least one
    /// command has completed the error is [`SessionError::Interrupted`] and
    /// carries the output captured so far.
    fn send(&mut self, commands: &[String]) -> Result<String, SessionError>;

    /// Releases the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the connection cannot be shut down cleanly.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens console sessions to device endpoints.
pub trait SessionConnector {
    /// Session type produced by this connector.
    type Session: CommandSession;

    /// Opens a session to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] on timeout or refusal.
    fn open(&self, endpoint: &Endpoint) -> Result<Self::Session, SessionError>;
}

impl<T: SessionConnector + ?Sized> SessionConnector for &T {
    type Session = T::Session;

    fn open(&self, endpoint: &Endpoint) -> Result<Self::Session, SessionError> {
        (**self).open(endpoint)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Host-supplied time source for captures and stage logs.
pub trait Clock {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
