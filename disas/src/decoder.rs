//! Seam to the decoder engine.
//!
//! The engine itself (opcode tables, operand rules) lives outside
//! this workspace. It is reached only through these traits, and only
//! after its family's decoder stage has been activated.

use crate::target::MachineModel;

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Mnemonic and operands.
    pub text: String,
    /// Bytes consumed.
    pub len: usize,
}

pub trait InstructionDecoder: Send + Sync {
    /// Decode the instruction at the start of `bytes`, located at
    /// `addr`. Returns `None` when the bytes do not form a valid
    /// instruction.
    fn decode(&self, addr: u64, bytes: &[u8]) -> Option<Decoded>;
}

/// Builds a decoder for one processor of a family. This is what the
/// decoder stage registers.
pub trait DecoderFactory: Send + Sync {
    fn create(&self, model: &MachineModel, cpu: &str) -> Box<dyn InstructionDecoder>;
}

impl<F> DecoderFactory for F
where
    F: Fn(&MachineModel, &str) -> Box<dyn InstructionDecoder> + Send + Sync,
{
    fn create(&self, model: &MachineModel, cpu: &str) -> Box<dyn InstructionDecoder> {
        self(model, cpu)
    }
}

/// Lists each little-endian 32-bit word as `.long 0x........`.
///
/// Used where no opcode tables are linked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawWordDecoder;

impl InstructionDecoder for RawWordDecoder {
    fn decode(&self, _addr: u64, bytes: &[u8]) -> Option<Decoded> {
        let word: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(Decoded {
            text: format!(".long {:#010x}", u32::from_le_bytes(word)),
            len: 4,
        })
    }
}

pub fn raw_word_factory(_model: &MachineModel, _cpu: &str) -> Box<dyn InstructionDecoder> {
    Box::new(RawWordDecoder)
}
