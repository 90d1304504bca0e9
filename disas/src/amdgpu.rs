//! AMDGPU (GCN / CDNA / RDNA) target bundle.
//!
//! Instructions are 32-bit words; encodings with a second dword or a
//! trailing literal constant run up to 12 bytes. Opcode tables are
//! not part of this crate: the default decoder lists raw words, and a
//! full decoder engine is attached with `TargetBundle::with_decoder`.

use gpudis_core::Family;

use crate::decoder::raw_word_factory;
use crate::target::{MachineModel, TargetBundle, TargetInfo};

pub const FAMILY: Family = Family::AMDGPU;

/// HSA code objects use `amdgcn--amdhsa`; newer toolchains spell the
/// vendor out.
pub const TRIPLES: &[&str] = &["amdgcn--amdhsa", "amdgcn-amd-amdhsa"];

pub const DEFAULT_TRIPLE: &str = "amdgcn--amdhsa";
pub const DEFAULT_PROCESSOR: &str = "gfx900";

/// ELF `e_machine` for AMDGPU code objects.
pub const EM_AMDGPU: u16 = 224;

pub const PROCESSORS: &[&str] = &[
    "gfx700", "gfx701", "gfx702", "gfx703", "gfx704", "gfx705", // GCN 2
    "gfx801", "gfx802", "gfx803", "gfx805", "gfx810", // GCN 3
    "gfx900", "gfx902", "gfx904", "gfx906", "gfx908", "gfx909", "gfx90a",
    "gfx90c", "gfx940", "gfx941", "gfx942", // GCN 5 / CDNA
    "gfx1010", "gfx1011", "gfx1012", "gfx1013", // RDNA 1
    "gfx1030", "gfx1031", "gfx1032", "gfx1033", "gfx1034", "gfx1035",
    "gfx1036", // RDNA 2
    "gfx1100", "gfx1101", "gfx1102", "gfx1103", // RDNA 3
];

pub fn target_info() -> TargetInfo {
    TargetInfo {
        family: FAMILY,
        name: "amdgcn",
        description: "AMD GCN GPUs",
        triples: TRIPLES,
    }
}

pub fn machine_model() -> MachineModel {
    MachineModel {
        family: FAMILY,
        processors: PROCESSORS,
        default_processor: DEFAULT_PROCESSOR,
        min_insn_len: 4,
        max_insn_len: 12,
        insn_align: 4,
    }
}

pub fn bundle() -> TargetBundle {
    TargetBundle::new(target_info(), machine_model(), raw_word_factory)
}
