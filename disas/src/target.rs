//! Per-family payloads registered by each activation stage.

use std::fmt;
use std::sync::Arc;

use gpudis_core::Family;

use crate::decoder::{DecoderFactory, InstructionDecoder};

/// Stage-1 payload: what the instruction set is called and which
/// target triples select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub family: Family,
    pub name: &'static str,
    pub description: &'static str,
    pub triples: &'static [&'static str],
}

impl TargetInfo {
    pub fn accepts_triple(&self, triple: &str) -> bool {
        self.triples.contains(&triple)
    }
}

/// Stage-2 payload: the machine-code model a decoder relies on.
///
/// Instructions are little-endian; every length is a multiple of
/// `insn_align`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineModel {
    pub family: Family,
    pub processors: &'static [&'static str],
    pub default_processor: &'static str,
    pub min_insn_len: usize,
    pub max_insn_len: usize,
    pub insn_align: usize,
}

impl MachineModel {
    pub fn has_processor(&self, cpu: &str) -> bool {
        self.processors.contains(&cpu)
    }
}

/// Everything one toolkit build ships for one family.
#[derive(Clone)]
pub struct TargetBundle {
    pub info: TargetInfo,
    pub machine: MachineModel,
    pub decoder: Arc<dyn DecoderFactory>,
}

impl TargetBundle {
    pub fn new(
        info: TargetInfo,
        machine: MachineModel,
        decoder: impl DecoderFactory + 'static,
    ) -> Self {
        debug_assert_eq!(info.family, machine.family);
        Self {
            info,
            machine,
            decoder: Arc::new(decoder),
        }
    }

    pub fn family(&self) -> &Family {
        &self.info.family
    }

    /// Replace the decoder factory, e.g. to plug in a full decoder
    /// engine in place of the default one.
    pub fn with_decoder<F>(mut self, factory: F) -> Self
    where
        F: Fn(&MachineModel, &str) -> Box<dyn InstructionDecoder> + Send + Sync + 'static,
    {
        self.decoder = Arc::new(factory);
        self
    }
}

impl fmt::Debug for TargetBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetBundle")
            .field("info", &self.info)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}
