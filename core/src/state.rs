use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::stage::CapabilityFlags;

/// Initialization state for one instruction-set family.
///
/// Uses a `Mutex` around the three flags for the check-and-set
/// sequence and an `AtomicBool` for lock-free reads once every
/// stage is active. Starts all-false and is never reset: capability
/// activation is one-way, so there is no teardown.
#[derive(Debug, Default)]
pub struct InitState {
    flags: Mutex<CapabilityFlags>,
    /// Published with Release after all three flags are set.
    ready: AtomicBool,
}

impl InitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-path check; `true` means every stage is active.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Copy of the current flags.
    pub fn snapshot(&self) -> CapabilityFlags {
        *self.lock()
    }

    /// Lock the flags.
    ///
    /// A poisoned lock is recovered: a flag is only set after its
    /// activation returned success, so a panic inside an activation
    /// primitive cannot leave the flags inconsistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, CapabilityFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the flags lock held and all flags set.
    pub(crate) fn publish_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}
