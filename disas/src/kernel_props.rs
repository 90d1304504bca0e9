//! Decoded views of the packed `amd_kernel_code_t` register fields.
//!
//! `compute_pgm_resource_registers` holds `COMPUTE_PGM_RSRC1` in its
//! low 32 bits and `COMPUTE_PGM_RSRC2` in its high 32 bits;
//! `code_properties` is a separate 32-bit mask of enabled SGPR
//! inputs and code traits.

fn field(value: u64, shift: u32, width: u32) -> u64 {
    (value >> shift) & ((1u64 << width) - 1)
}

fn flag(value: u64, bit: u32) -> bool {
    field(value, bit, 1) != 0
}

/// Work-item id components preloaded into VGPRs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VgprWorkItemId {
    #[default]
    X,
    Xy,
    Xyz,
}

impl VgprWorkItemId {
    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => Self::X,
            1 => Self::Xy,
            _ => Self::Xyz,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FpRoundMode {
    #[default]
    NearEven,
    PlusInfinity,
    MinusInfinity,
    Zero,
}

impl FpRoundMode {
    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => Self::NearEven,
            1 => Self::PlusInfinity,
            2 => Self::MinusInfinity,
            _ => Self::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FpDenormMode {
    #[default]
    FlushSrcDst,
    FlushDst,
    FlushSrc,
    FlushNone,
}

impl FpDenormMode {
    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => Self::FlushSrcDst,
            1 => Self::FlushDst,
            2 => Self::FlushSrc,
            _ => Self::FlushNone,
        }
    }
}

/// `COMPUTE_PGM_RSRC1` and `COMPUTE_PGM_RSRC2`, field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgmResources {
    // RSRC1
    pub granulated_workitem_vgpr_count: u8,
    pub granulated_wavefront_sgpr_count: u8,
    pub priority: u8,
    pub float_round_mode_32: FpRoundMode,
    pub float_round_mode_16_64: FpRoundMode,
    pub float_denorm_mode_32: FpDenormMode,
    pub float_denorm_mode_16_64: FpDenormMode,
    pub privileged: bool,
    pub enable_dx10_clamp: bool,
    pub debug_mode: bool,
    pub enable_ieee_mode: bool,
    pub bulky: bool,
    pub cdbg_user: bool,
    pub fp16_overflow: bool,
    // RSRC2
    pub enable_sgpr_private_segment_wavefront_offset: bool,
    pub user_sgpr_count: u8,
    pub enable_trap_handler: bool,
    pub enable_sgpr_workgroup_id_x: bool,
    pub enable_sgpr_workgroup_id_y: bool,
    pub enable_sgpr_workgroup_id_z: bool,
    pub enable_sgpr_workgroup_info: bool,
    pub enable_vgpr_workitem_id: VgprWorkItemId,
    pub enable_exception_address_watch: bool,
    pub enable_exception_memory: bool,
    pub granulated_lds_size: u16,
    pub enable_exception_fp_invalid_operation: bool,
    pub enable_exception_fp_denormal_source: bool,
    pub enable_exception_fp_division_by_zero: bool,
    pub enable_exception_fp_overflow: bool,
    pub enable_exception_fp_underflow: bool,
    pub enable_exception_fp_inexact: bool,
    pub enable_exception_int_divide_by_zero: bool,
}

impl PgmResources {
    pub fn decode(raw: u64) -> Self {
        const RSRC2: u32 = 32;
        Self {
            granulated_workitem_vgpr_count: field(raw, 0, 6) as u8,
            granulated_wavefront_sgpr_count: field(raw, 6, 4) as u8,
            priority: field(raw, 10, 2) as u8,
            float_round_mode_32: FpRoundMode::from_bits(field(raw, 12, 2)),
            float_round_mode_16_64: FpRoundMode::from_bits(field(raw, 14, 2)),
            float_denorm_mode_32: FpDenormMode::from_bits(field(raw, 16, 2)),
            float_denorm_mode_16_64: FpDenormMode::from_bits(field(raw, 18, 2)),
            privileged: flag(raw, 20),
            enable_dx10_clamp: flag(raw, 21),
            debug_mode: flag(raw, 22),
            enable_ieee_mode: flag(raw, 23),
            bulky: flag(raw, 24),
            cdbg_user: flag(raw, 25),
            fp16_overflow: flag(raw, 26),

            enable_sgpr_private_segment_wavefront_offset: flag(raw, RSRC2),
            user_sgpr_count: field(raw, RSRC2 + 1, 5) as u8,
            enable_trap_handler: flag(raw, RSRC2 + 6),
            enable_sgpr_workgroup_id_x: flag(raw, RSRC2 + 7),
            enable_sgpr_workgroup_id_y: flag(raw, RSRC2 + 8),
            enable_sgpr_workgroup_id_z: flag(raw, RSRC2 + 9),
            enable_sgpr_workgroup_info: flag(raw, RSRC2 + 10),
            enable_vgpr_workitem_id: VgprWorkItemId::from_bits(field(raw, RSRC2 + 11, 2)),
            enable_exception_address_watch: flag(raw, RSRC2 + 13),
            enable_exception_memory: flag(raw, RSRC2 + 14),
            granulated_lds_size: field(raw, RSRC2 + 15, 9) as u16,
            enable_exception_fp_invalid_operation: flag(raw, RSRC2 + 24),
            enable_exception_fp_denormal_source: flag(raw, RSRC2 + 25),
            enable_exception_fp_division_by_zero: flag(raw, RSRC2 + 26),
            enable_exception_fp_overflow: flag(raw, RSRC2 + 27),
            enable_exception_fp_underflow: flag(raw, RSRC2 + 28),
            enable_exception_fp_inexact: flag(raw, RSRC2 + 29),
            enable_exception_int_divide_by_zero: flag(raw, RSRC2 + 30),
        }
    }

    /// VGPRs per work-item, from the granulated count (blocks of 4).
    pub fn workitem_vgprs(&self) -> u32 {
        (u32::from(self.granulated_workitem_vgpr_count) + 1) * 4
    }
}

/// The `code_properties` mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeProperties {
    pub enable_sgpr_private_segment_buffer: bool,
    pub enable_sgpr_dispatch_ptr: bool,
    pub enable_sgpr_queue_ptr: bool,
    pub enable_sgpr_kernarg_segment_ptr: bool,
    pub enable_sgpr_dispatch_id: bool,
    pub enable_sgpr_flat_scratch_init: bool,
    pub enable_sgpr_private_segment_size: bool,
    pub enable_sgpr_grid_workgroup_count_x: bool,
    pub enable_sgpr_grid_workgroup_count_y: bool,
    pub enable_sgpr_grid_workgroup_count_z: bool,
    pub enable_ordered_append_gds: bool,
    /// Encoded: 0, 1, 2, 3 mean 2, 4, 8, 16 bytes.
    pub private_element_size: u8,
    pub is_ptr64: bool,
    pub is_dynamic_callstack: bool,
    pub is_debug_supported: bool,
    pub is_xnack_supported: bool,
}

impl CodeProperties {
    pub fn decode(raw: u32) -> Self {
        let raw = u64::from(raw);
        Self {
            enable_sgpr_private_segment_buffer: flag(raw, 0),
            enable_sgpr_dispatch_ptr: flag(raw, 1),
            enable_sgpr_queue_ptr: flag(raw, 2),
            enable_sgpr_kernarg_segment_ptr: flag(raw, 3),
            enable_sgpr_dispatch_id: flag(raw, 4),
            enable_sgpr_flat_scratch_init: flag(raw, 5),
            enable_sgpr_private_segment_size: flag(raw, 6),
            enable_sgpr_grid_workgroup_count_x: flag(raw, 7),
            enable_sgpr_grid_workgroup_count_y: flag(raw, 8),
            enable_sgpr_grid_workgroup_count_z: flag(raw, 9),
            enable_ordered_append_gds: flag(raw, 16),
            private_element_size: field(raw, 17, 2) as u8,
            is_ptr64: flag(raw, 19),
            is_dynamic_callstack: flag(raw, 20),
            is_debug_supported: flag(raw, 21),
            is_xnack_supported: flag(raw, 22),
        }
    }

    /// Private element size in bytes.
    pub fn private_element_bytes(&self) -> u32 {
        2 << self.private_element_size
    }
}
