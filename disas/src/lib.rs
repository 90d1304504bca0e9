//! GPU disassembler toolkit.
//!
//! Holds the target registry that capability activation fills in,
//! the per-family bundles this build ships, and the disassembly
//! session that runs a registered decoder over machine code. The
//! `Toolkit` type is the `CapabilityProvider` handed to
//! `gpudis_core::CapabilityInitializer`.

pub mod amdgpu;
pub mod code_object;
pub mod config;
pub mod decoder;
pub mod disassembler;
pub mod kernel_meta;
pub mod kernel_props;
pub mod registry;
pub mod target;
pub mod toolkit;

pub use code_object::{split_kernel_code, CodeObject, CodeObjectError, KernelCodeHeader};
pub use config::{ConfigError, DisasConfig};
pub use decoder::{Decoded, DecoderFactory, InstructionDecoder, RawWordDecoder};
pub use disassembler::{DisasError, Disassembler, Line};
pub use kernel_meta::{extract_kernel_args, kernel_args, KernelArg, KernelMetaError};
pub use kernel_props::{CodeProperties, FpDenormMode, FpRoundMode, PgmResources, VgprWorkItemId};
pub use registry::TargetRegistry;
pub use target::{MachineModel, TargetBundle, TargetInfo};
pub use toolkit::Toolkit;
