//! Idempotent, ordered, thread-safe capability activation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::InitError;
use crate::family::Family;
use crate::provider::CapabilityProvider;
use crate::stage::{CapabilityFlags, Stage};
use crate::state::InitState;

/// Bring `family` to the fully-activated state.
///
/// Pending stages are activated in order (metadata, machine model,
/// decoder) under the state lock, so concurrent first callers never
/// both activate the same stage. Active stages are skipped. The
/// first failing stage aborts the sequence: later stages are not
/// attempted and earlier flags stay set.
///
/// Once every stage is active, calls return without locking.
pub fn ensure_ready<P>(state: &InitState, provider: &P, family: &Family) -> Result<(), InitError>
where
    P: CapabilityProvider + ?Sized,
{
    if state.is_ready() {
        return Ok(());
    }

    let mut flags = state.lock();
    for stage in Stage::ALL {
        if flags.is_active(stage) {
            debug!(%family, %stage, "capability already active");
            continue;
        }
        debug!(%family, %stage, "activating capability");
        if let Err(source) = provider.activate(stage, family) {
            warn!(%family, %stage, error = %source, "capability activation failed");
            return Err(InitError::InitializationFailed {
                family: family.clone(),
                stage,
                source,
            });
        }
        flags.set_active(stage);
    }

    debug_assert!(flags.is_ready());
    state.publish_ready();
    info!(%family, "decode capability ready");
    Ok(())
}

/// Composition-root owner of the capability provider and the
/// per-family initialization states.
///
/// Each family has its own `InitState`; families initialize
/// independently and the table lock is never held while a
/// provider call runs.
pub struct CapabilityInitializer<P> {
    provider: P,
    states: Mutex<HashMap<Family, Arc<InitState>>>,
}

impl<P: CapabilityProvider> CapabilityInitializer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Initialization state for `family`, created all-false on first
    /// use.
    pub fn state(&self, family: &Family) -> Arc<InitState> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.entry(family.clone()).or_default().clone()
    }

    /// See [`ensure_ready`].
    pub fn ensure_ready(&self, family: &Family) -> Result<(), InitError> {
        let state = self.state(family);
        ensure_ready(&state, &self.provider, family)
    }

    /// Existing state for `family`; never creates one.
    fn existing(&self, family: &Family) -> Option<Arc<InitState>> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(family).cloned()
    }

    pub fn is_ready(&self, family: &Family) -> bool {
        self.existing(family).is_some_and(|s| s.is_ready())
    }

    /// Current flags; all-false for a family never requested.
    pub fn snapshot(&self, family: &Family) -> CapabilityFlags {
        self.existing(family)
            .map_or(CapabilityFlags::NONE, |s| s.snapshot())
    }

    /// Families that have been requested at least once.
    pub fn families(&self) -> Vec<Family> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Family> = states.keys().cloned().collect();
        out.sort();
        out
    }
}
