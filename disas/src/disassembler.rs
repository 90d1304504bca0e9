//! Disassembly session over an activated target.

use std::fmt::Write as _;
use std::sync::Arc;

use gpudis_core::{Family, Stage};
use thiserror::Error;

use crate::decoder::InstructionDecoder;
use crate::registry::TargetRegistry;
use crate::target::MachineModel;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisasError {
    #[error("no registered target accepts triple {0:?}")]
    UnknownTriple(String),
    #[error("{family} is not ready to decode: {stage} stage is not active")]
    NotReady { family: Family, stage: Stage },
    #[error("{family} has no processor named {cpu:?}")]
    UnknownProcessor { family: Family, cpu: String },
}

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub addr: u64,
    pub len: usize,
    pub text: String,
}

/// A decoder bound to one processor of an activated family.
///
/// Creating one performs no activation: the family's decoder stage
/// must already be registered.
pub struct Disassembler {
    family: Family,
    cpu: String,
    model: Arc<MachineModel>,
    decoder: Box<dyn InstructionDecoder>,
}

impl Disassembler {
    pub fn new(registry: &TargetRegistry, triple: &str, cpu: &str) -> Result<Self, DisasError> {
        let family = registry
            .family_for_triple(triple)
            .ok_or_else(|| DisasError::UnknownTriple(triple.to_string()))?;

        let not_ready = |stage| DisasError::NotReady {
            family: family.clone(),
            stage,
        };
        let model = registry
            .machine_model(&family)
            .ok_or_else(|| not_ready(Stage::MachineModel))?;
        let factory = registry
            .decoder_factory(&family)
            .ok_or_else(|| not_ready(Stage::Decoder))?;

        let cpu = if cpu.is_empty() {
            model.default_processor
        } else {
            cpu
        };
        if !model.has_processor(cpu) {
            return Err(DisasError::UnknownProcessor {
                family,
                cpu: cpu.to_string(),
            });
        }

        let decoder = factory.create(&model, cpu);
        Ok(Self {
            family,
            cpu: cpu.to_string(),
            model,
            decoder,
        })
    }

    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn machine_model(&self) -> &MachineModel {
        &self.model
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// Always consumes at least one byte. Undecodable input yields a
    /// `.byte` line covering one minimum-length chunk, or the whole
    /// remainder when fewer bytes are left.
    pub fn decode_one(&self, addr: u64, bytes: &[u8]) -> Line {
        debug_assert!(!bytes.is_empty());
        let min = self.model.min_insn_len.max(1);

        if bytes.len() >= min {
            if let Some(d) = self.decoder.decode(addr, bytes) {
                if d.len > 0 && d.len <= bytes.len() {
                    return Line {
                        addr,
                        len: d.len,
                        text: d.text.trim_start().to_string(),
                    };
                }
            }
        }

        let len = min.min(bytes.len());
        Line {
            addr,
            len,
            text: byte_directive(&bytes[..len]),
        }
    }

    /// Decode `bytes` front to back, `base_addr` being the address of
    /// the first byte.
    pub fn disassemble(&self, base_addr: u64, bytes: &[u8]) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let line = self.decode_one(base_addr.wrapping_add(pos as u64), &bytes[pos..]);
            pos += line.len;
            lines.push(line);
        }
        lines
    }
}

fn byte_directive(bytes: &[u8]) -> String {
    let mut s = String::from(".byte ");
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        let _ = write!(s, "{b:#04x}");
    }
    s
}
