use std::collections::HashMap;
use std::sync::Arc;

use gpudis_core::{ActivationError, CapabilityProvider, Family};

use crate::registry::TargetRegistry;
use crate::target::TargetBundle;

/// The families compiled into this build, plus the registry their
/// activation fills in.
///
/// A family without a bundle fails at the metadata stage with
/// `ActivationError::Unsupported`.
#[derive(Debug)]
pub struct Toolkit {
    bundles: HashMap<Family, TargetBundle>,
    registry: Arc<TargetRegistry>,
}

impl Toolkit {
    /// Toolkit with no families and a fresh registry.
    pub fn empty() -> Self {
        Self::with_registry(Arc::new(TargetRegistry::new()))
    }

    pub fn with_registry(registry: Arc<TargetRegistry>) -> Self {
        Self {
            bundles: HashMap::new(),
            registry,
        }
    }

    /// Toolkit shipping every family enabled by cargo features.
    pub fn builtin() -> Self {
        let toolkit = Self::empty();
        #[cfg(feature = "amdgpu")]
        let toolkit = toolkit.with_bundle(crate::amdgpu::bundle());
        toolkit
    }

    /// Add or replace the bundle for its family.
    pub fn with_bundle(mut self, bundle: TargetBundle) -> Self {
        self.bundles.insert(bundle.family().clone(), bundle);
        self
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn supports(&self, family: &Family) -> bool {
        self.bundles.contains_key(family)
    }

    /// Families this build ships, sorted.
    pub fn families(&self) -> Vec<Family> {
        let mut out: Vec<Family> = self.bundles.keys().cloned().collect();
        out.sort();
        out
    }

    fn bundle(&self, family: &Family) -> Result<&TargetBundle, ActivationError> {
        self.bundles
            .get(family)
            .ok_or_else(|| ActivationError::Unsupported {
                family: family.clone(),
            })
    }
}

impl Default for Toolkit {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityProvider for Toolkit {
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError> {
        let bundle = self.bundle(family)?;
        self.registry.register_info(bundle.info.clone())
    }

    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError> {
        let bundle = self.bundle(family)?;
        self.registry.register_machine_model(bundle.machine.clone())
    }

    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError> {
        let bundle = self.bundle(family)?;
        self.registry
            .register_decoder(family, Arc::clone(&bundle.decoder))
    }
}
