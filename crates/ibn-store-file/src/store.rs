// crates/ibn-store-file/src/store.rs
// ============================================================================
// Module: File Stores
// Description: YAML policy store and JSON inventory store.
// Purpose: Whole-file load and atomic whole-file save for pipeline state.
// Dependencies: ibn-core, serde_json, serde_yaml, tempfile, tracing
// ============================================================================

//! ## Overview
//! [`YamlPolicyStore`] implements [`PolicyRepository`] over one YAML file and
//! [`JsonInventoryStore`] implements [`InventoryRepository`] over one JSON
//! file. A missing file is an empty store (or no snapshot), never an error.
//!
//! Loads fail closed: files above the size limit, non-UTF-8 content, and
//! unparseable documents are reported as [`StoreError`], and documents whose
//! map keys disagree with the records they index are rejected as invalid.
//! Saves serialize first, then write a sibling temporary file, sync it, and
//! rename it over the target so a reader never observes a half-written file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use ibn_core::InventoryRepository;
use ibn_core::InventorySnapshot;
use ibn_core::PolicyRepository;
use ibn_core::PolicyStoreFile;
use ibn_core::StoreError;
use tempfile::NamedTempFile;
use tracing::debug;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of the policy store file.
pub const MAX_POLICY_FILE_BYTES: usize = 8 * 1024 * 1024;

/// Maximum size of the inventory file.
pub const MAX_INVENTORY_FILE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Policy repository backed by a YAML file.
#[derive(Debug, Clone)]
pub struct YamlPolicyStore {
    /// Policy file path.
    path: PathBuf,
}

impl YamlPolicyStore {
    /// Creates a store for `path`; the file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the policy file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicyRepository for YamlPolicyStore {
    fn load(&self) -> Result<PolicyStoreFile, StoreError> {
        let Some(text) = read_limited(&self.path, MAX_POLICY_FILE_BYTES)? else {
            return Ok(PolicyStoreFile::default());
        };
        if text.trim().is_empty() {
            return Ok(PolicyStoreFile::default());
        }
        let file: PolicyStoreFile = serde_yaml::from_str(&text)
            .map_err(|err| StoreError::Corrupt(format!("{}: {err}", self.path.display())))?;
        if let Some(key) = file.mismatched_key() {
            return Err(StoreError::Invalid(format!(
                "{}: entry '{key}' holds a policy with a different policy_id",
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), policies = file.policies.len(), "policy store loaded");
        Ok(file)
    }

    fn save(&self, file: &PolicyStoreFile) -> Result<(), StoreError> {
        if let Some(key) = file.mismatched_key() {
            return Err(StoreError::Invalid(format!(
                "entry '{key}' holds a policy with a different policy_id"
            )));
        }
        let text = serde_yaml::to_string(file)
            .map_err(|err| StoreError::Invalid(format!("policy store encode failed: {err}")))?;
        if text.len() > MAX_POLICY_FILE_BYTES {
            return Err(StoreError::Invalid("policy store exceeds size limit".to_string()));
        }
        write_atomic(&self.path, text.as_bytes())?;
        debug!(path = %self.path.display(), policies = file.policies.len(), "policy store saved");
        Ok(())
    }
}

// ============================================================================
// SECTION: Inventory Store
// ============================================================================

/// Inventory repository backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonInventoryStore {
    /// Inventory file path.
    path: PathBuf,
}

impl JsonInventoryStore {
    /// Creates a store for `path`; the file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the inventory file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InventoryRepository for JsonInventoryStore {
    fn load(&self) -> Result<Option<InventorySnapshot>, StoreError> {
        let Some(text) = read_limited(&self.path, MAX_INVENTORY_FILE_BYTES)? else {
            return Ok(None);
        };
        let snapshot: InventorySnapshot = serde_json::from_str(&text)
            .map_err(|err| StoreError::Corrupt(format!("{}: {err}", self.path.display())))?;
        if let Some((key, _)) = snapshot.devices.iter().find(|(key, device)| **key != device.name)
        {
            return Err(StoreError::Invalid(format!(
                "{}: entry '{key}' holds a device with a different name",
                self.path.display()
            )));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| StoreError::Invalid(format!("inventory encode failed: {err}")))?;
        bytes.push(b'\n');
        if bytes.len() > MAX_INVENTORY_FILE_BYTES {
            return Err(StoreError::Invalid("inventory exceeds size limit".to_string()));
        }
        write_atomic(&self.path, &bytes)?;
        debug!(
            path = %self.path.display(),
            devices = snapshot.devices.len(),
            captured_at = %snapshot.captured_at,
            "inventory saved"
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads `path` as UTF-8 up to `max_bytes`; `None` when the file does not exist.
fn read_limited(path: &Path, max_bytes: usize) -> Result<Option<String>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::Io(format!("{}: {err}", path.display()))),
    };
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| StoreError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > max_bytes {
        return Err(StoreError::Invalid(format!("{} exceeds size limit", path.display())));
    }
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| StoreError::Corrupt(format!("{} is not valid UTF-8", path.display())))
}

/// Replaces `path` with `bytes` through a synced sibling temporary file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|err| StoreError::Io(format!("{}: {err}", dir.display())))?;
    let io_error = |err: std::io::Error| StoreError::Io(format!("{}: {err}", path.display()));
    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    temp.write_all(bytes).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;
    temp.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
