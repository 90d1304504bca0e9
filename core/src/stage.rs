//! Capability stages and the flags that track them.
//!
//! Activation is a strictly linear, forward-only chain:
//!
//! ```text
//! Uninitialized -> MetadataActive -> MachineModelActive -> DecoderActive
//! ```
//!
//! There is no transition back and no teardown state; `DecoderActive`
//! is terminal for the life of the process.

use std::fmt;

/// One capability layer, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Instruction-set metadata (target info).
    Metadata,
    /// Machine-code model (registers, instruction sizes).
    MachineModel,
    /// Decoder registration.
    Decoder,
}

impl Stage {
    /// All stages in the order they must be activated.
    pub const ALL: [Stage; 3] = [Stage::Metadata, Stage::MachineModel, Stage::Decoder];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Metadata => "metadata",
            Stage::MachineModel => "machine-model",
            Stage::Decoder => "decoder",
        }
    }

    /// The stage that must be active before this one may be activated.
    pub fn prerequisite(self) -> Option<Stage> {
        match self {
            Stage::Metadata => None,
            Stage::MachineModel => Some(Stage::Metadata),
            Stage::Decoder => Some(Stage::MachineModel),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position in the activation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    MetadataActive,
    MachineModelActive,
    DecoderActive,
}

/// The three process-wide capability flags for one family.
///
/// Invariant: `decoder => machine_model => metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityFlags {
    pub metadata: bool,
    pub machine_model: bool,
    pub decoder: bool,
}

impl CapabilityFlags {
    pub const NONE: CapabilityFlags = CapabilityFlags {
        metadata: false,
        machine_model: false,
        decoder: false,
    };

    pub const ALL: CapabilityFlags = CapabilityFlags {
        metadata: true,
        machine_model: true,
        decoder: true,
    };

    pub fn is_active(&self, stage: Stage) -> bool {
        match stage {
            Stage::Metadata => self.metadata,
            Stage::MachineModel => self.machine_model,
            Stage::Decoder => self.decoder,
        }
    }

    /// Mark `stage` active. Callers must have activated its
    /// prerequisite first.
    pub(crate) fn set_active(&mut self, stage: Stage) {
        debug_assert!(stage
            .prerequisite()
            .map_or(true, |prev| self.is_active(prev)));
        match stage {
            Stage::Metadata => self.metadata = true,
            Stage::MachineModel => self.machine_model = true,
            Stage::Decoder => self.decoder = true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.metadata && self.machine_model && self.decoder
    }

    /// First stage in activation order that is not active yet.
    pub fn next_pending(&self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|&s| !self.is_active(s))
    }

    /// Check `decoder => machine_model => metadata`.
    pub fn is_ordered(&self) -> bool {
        (!self.decoder || self.machine_model) && (!self.machine_model || self.metadata)
    }

    pub fn phase(&self) -> Phase {
        match (self.metadata, self.machine_model, self.decoder) {
            (true, true, true) => Phase::DecoderActive,
            (true, true, false) => Phase::MachineModelActive,
            (true, false, _) => Phase::MetadataActive,
            _ => Phase::Uninitialized,
        }
    }
}
