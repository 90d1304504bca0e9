use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gpudis_core::{ActivationError, Family, Stage};
use tracing::debug;

use crate::decoder::DecoderFactory;
use crate::target::{MachineModel, TargetInfo};

#[derive(Default)]
struct Entry {
    info: Option<Arc<TargetInfo>>,
    machine: Option<Arc<MachineModel>>,
    decoder: Option<Arc<dyn DecoderFactory>>,
}

/// Registration tables filled in by the activation stages.
///
/// Add-only: entries are never removed, and registering an entry
/// that is already present is a no-op. Each stage refuses to
/// register unless the previous stage is present for the family.
#[derive(Default)]
pub struct TargetRegistry {
    entries: RwLock<HashMap<Family, Entry>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Family, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Family, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register stage-1 info. Triples are unique across families:
    /// info claiming a triple another family already accepts is
    /// refused, so `family_for_triple` has a single answer.
    pub fn register_info(&self, info: TargetInfo) -> Result<(), ActivationError> {
        let mut entries = self.write();
        let clash = entries
            .iter()
            .filter(|(family, _)| **family != info.family)
            .filter_map(|(_, e)| e.info.as_ref())
            .find_map(|other| {
                info.triples
                    .iter()
                    .find(|t| other.accepts_triple(t))
                    .map(|t| (t.to_string(), other.family.clone()))
            });
        if let Some((triple, owner)) = clash {
            return Err(ActivationError::DuplicateTriple { triple, owner });
        }

        let entry = entries.entry(info.family.clone()).or_default();
        if entry.info.is_none() {
            debug!(family = %info.family, name = info.name, "registered target info");
            entry.info = Some(Arc::new(info));
        }
        Ok(())
    }

    pub fn register_machine_model(&self, model: MachineModel) -> Result<(), ActivationError> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&model.family)
            .filter(|e| e.info.is_some())
            .ok_or(ActivationError::MissingPrerequisite {
                stage: Stage::Metadata,
            })?;
        if entry.machine.is_none() {
            debug!(family = %model.family, processors = model.processors.len(), "registered machine model");
            entry.machine = Some(Arc::new(model));
        }
        Ok(())
    }

    pub fn register_decoder(
        &self,
        family: &Family,
        factory: Arc<dyn DecoderFactory>,
    ) -> Result<(), ActivationError> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(family)
            .filter(|e| e.machine.is_some())
            .ok_or(ActivationError::MissingPrerequisite {
                stage: Stage::MachineModel,
            })?;
        if entry.decoder.is_none() {
            debug!(%family, "registered decoder");
            entry.decoder = Some(factory);
        }
        Ok(())
    }

    pub fn is_registered(&self, family: &Family, stage: Stage) -> bool {
        self.read().get(family).is_some_and(|e| match stage {
            Stage::Metadata => e.info.is_some(),
            Stage::MachineModel => e.machine.is_some(),
            Stage::Decoder => e.decoder.is_some(),
        })
    }

    pub fn info(&self, family: &Family) -> Option<Arc<TargetInfo>> {
        self.read().get(family).and_then(|e| e.info.clone())
    }

    pub fn machine_model(&self, family: &Family) -> Option<Arc<MachineModel>> {
        self.read().get(family).and_then(|e| e.machine.clone())
    }

    pub fn decoder_factory(&self, family: &Family) -> Option<Arc<dyn DecoderFactory>> {
        self.read().get(family).and_then(|e| e.decoder.clone())
    }

    /// Family whose registered target info accepts `triple`.
    pub fn family_for_triple(&self, triple: &str) -> Option<Family> {
        self.read()
            .values()
            .filter_map(|e| e.info.as_ref())
            .find(|info| info.accepts_triple(triple))
            .map(|info| info.family.clone())
    }

    /// Families with at least target info registered, sorted.
    pub fn families(&self) -> Vec<Family> {
        let mut out: Vec<Family> = self
            .read()
            .iter()
            .filter(|(_, e)| e.info.is_some())
            .map(|(f, _)| f.clone())
            .collect();
        out.sort();
        out
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("families", &self.families())
            .finish()
    }
}
