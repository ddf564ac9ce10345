// crates/ibn-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Repositories
// Description: Mutex-backed policy and inventory repositories plus a logical clock.
// Purpose: Deterministic doubles for tests and embedded use without file I/O.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These implementations honour the same whole-file load/save contract as the
//! file-backed stores. Lock poisoning is reported as [`StoreError::Io`] rather
//! than panicking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::InventorySnapshot;
use crate::core::PolicyStoreFile;
use crate::core::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::InventoryRepository;
use crate::interfaces::PolicyRepository;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// In-memory policy store.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    /// Stored file and number of saves.
    state: Mutex<(PolicyStoreFile, usize)>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `file`.
    #[must_use]
    pub fn with_file(file: PolicyStoreFile) -> Self {
        Self {
            state: Mutex::new((file, 0)),
        }
    }

    /// Returns how many times the store has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the lock is poisoned.
    pub fn save_count(&self) -> Result<usize, StoreError> {
        let guard = self.state.lock().map_err(|_| poisoned())?;
        Ok(guard.1)
    }
}

impl PolicyRepository for InMemoryPolicyStore {
    fn load(&self) -> Result<PolicyStoreFile, StoreError> {
        let guard = self.state.lock().map_err(|_| poisoned())?;
        Ok(guard.0.clone())
    }

    fn save(&self, file: &PolicyStoreFile) -> Result<(), StoreError> {
        if let Some(key) = file.mismatched_key() {
            return Err(StoreError::Invalid(format!("policy stored under mismatched key {key}")));
        }
        let mut guard = self.state.lock().map_err(|_| poisoned())?;
        guard.0 = file.clone();
        guard.1 += 1;
        Ok(())
    }
}

// ============================================================================
// SECTION: Inventory Store
// ============================================================================

/// In-memory inventory snapshot store.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    /// Stored snapshot.
    snapshot: Mutex<Option<InventorySnapshot>>,
}

impl InMemoryInventoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: InventorySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl InventoryRepository for InMemoryInventoryStore {
    fn load(&self) -> Result<Option<InventorySnapshot>, StoreError> {
        let guard = self.snapshot.lock().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), StoreError> {
        let mut guard = self.snapshot.lock().map_err(|_| poisoned())?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Io("in-memory store lock poisoned".to_string())
}

// ============================================================================
// SECTION: Logical Clock
// ============================================================================

/// Clock that returns strictly increasing logical ticks.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Next tick to hand out.
    next: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock whose first tick is `start`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp::Logical(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
