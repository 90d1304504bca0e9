//! GPU code-object reading.
//!
//! Minimal ELF64 little-endian section reader plus the 256-byte
//! `amd_kernel_code_t` header that precedes kernel machine code in
//! the `.text` section of HSA code objects.

use thiserror::Error;

use crate::kernel_props::{CodeProperties, PgmResources};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;
const SHT_NOBITS: u32 = 8;

/// Size of `amd_kernel_code_t`.
pub const KERNEL_CODE_HEADER_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeObjectError {
    #[error("not an ELF file")]
    NotElf,
    #[error("not a 64-bit little-endian ELF")]
    UnsupportedClass,
    #[error("{0} out of bounds")]
    Truncated(&'static str),
    #[error("missing {0} section")]
    MissingSection(String),
    #[error("kernel code must be at least {KERNEL_CODE_HEADER_LEN} bytes long (got {0})")]
    ShortKernelCode(usize),
}

/// One ELF section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub addr: u64,
    pub data: Vec<u8>,
}

/// Parsed ELF container.
#[derive(Debug, Clone)]
pub struct CodeObject {
    pub e_machine: u16,
    pub sections: Vec<Section>,
}

impl CodeObject {
    pub fn parse(data: &[u8]) -> Result<Self, CodeObjectError> {
        if data.len() < 4 || data[..4] != ELF_MAGIC {
            return Err(CodeObjectError::NotElf);
        }
        if data.len() < EHDR_SIZE {
            return Err(CodeObjectError::Truncated("ELF header"));
        }
        if data[4] != ELFCLASS64 || data[5] != ELFDATA2LSB {
            return Err(CodeObjectError::UnsupportedClass);
        }

        let e_machine = le_u16(data, 0x12);
        let sh_off = le_u64(data, 0x28) as usize;
        let sh_ent = le_u16(data, 0x3a) as usize;
        let sh_num = le_u16(data, 0x3c) as usize;
        let sh_strndx = le_u16(data, 0x3e) as usize;

        if sh_num == 0 {
            return Ok(Self {
                e_machine,
                sections: Vec::new(),
            });
        }
        if sh_ent < SHDR_SIZE {
            return Err(CodeObjectError::Truncated("section header entry"));
        }

        let mut headers = Vec::with_capacity(sh_num);
        for i in 0..sh_num {
            let off = sh_ent
                .checked_mul(i)
                .and_then(|o| o.checked_add(sh_off))
                .filter(|o| o.saturating_add(SHDR_SIZE) <= data.len())
                .ok_or(CodeObjectError::Truncated("section header"))?;
            headers.push(RawShdr {
                name: le_u32(data, off),
                sh_type: le_u32(data, off + 4),
                addr: le_u64(data, off + 16),
                offset: le_u64(data, off + 24),
                size: le_u64(data, off + 32),
            });
        }

        let strtab = headers
            .get(sh_strndx)
            .map(|h| section_bytes(data, h))
            .transpose()?
            .unwrap_or(&[]);

        let mut sections = Vec::with_capacity(sh_num);
        for h in &headers {
            sections.push(Section {
                name: c_str_at(strtab, h.name as usize),
                addr: h.addr,
                data: section_bytes(data, h)?.to_vec(),
            });
        }

        Ok(Self {
            e_machine,
            sections,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// The `.text` section, which holds kernel machine code.
    pub fn text(&self) -> Result<&Section, CodeObjectError> {
        self.section(".text")
            .ok_or_else(|| CodeObjectError::MissingSection(".text".into()))
    }
}

/// Parse `data` as ELF and return a copy of its `.text` section.
pub fn read_text_section(data: &[u8]) -> Result<Section, CodeObjectError> {
    CodeObject::parse(data)?.text().cloned()
}

struct RawShdr {
    name: u32,
    sh_type: u32,
    addr: u64,
    offset: u64,
    size: u64,
}

fn section_bytes<'a>(data: &'a [u8], h: &RawShdr) -> Result<&'a [u8], CodeObjectError> {
    if h.sh_type == SHT_NOBITS {
        return Ok(&[]);
    }
    let start = h.offset as usize;
    start
        .checked_add(h.size as usize)
        .and_then(|end| data.get(start..end))
        .ok_or(CodeObjectError::Truncated("section data"))
}

fn c_str_at(table: &[u8], off: usize) -> String {
    let Some(tail) = table.get(off..) else {
        return String::new();
    };
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).into_owned()
}

// -- Little-endian field helpers (callers bounds-check) --

fn le_u16(d: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([d[off], d[off + 1]])
}

fn le_u32(d: &[u8], off: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&d[off..off + 4]);
    u32::from_le_bytes(buf)
}

fn le_u64(d: &[u8], off: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&d[off..off + 8]);
    u64::from_le_bytes(buf)
}

/// `amd_kernel_code_t`: kernel descriptor placed in front of the
/// machine code (code object v2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelCodeHeader {
    pub kernel_code_version_major: u32,
    pub kernel_code_version_minor: u32,
    pub machine_kind: u16,
    pub machine_version_major: u16,
    pub machine_version_minor: u16,
    pub machine_version_stepping: u16,
    pub kernel_code_entry_byte_offset: i64,
    pub kernel_code_prefetch_byte_offset: i64,
    pub kernel_code_prefetch_byte_size: u64,
    pub compute_pgm_resource_registers: u64,
    pub code_properties: u32,
    pub workitem_private_segment_byte_size: u32,
    pub workgroup_group_segment_byte_size: u32,
    pub gds_segment_byte_size: u32,
    pub kernarg_segment_byte_size: u64,
    pub workgroup_fbarrier_count: u32,
    pub wavefront_sgpr_count: u16,
    pub workitem_vgpr_count: u16,
    pub reserved_vgpr_first: u16,
    pub reserved_vgpr_count: u16,
    pub reserved_sgpr_first: u16,
    pub reserved_sgpr_count: u16,
    pub debug_wavefront_private_segment_offset_sgpr: u16,
    pub debug_private_segment_buffer_sgpr: u16,
    /// Power-of-two exponents.
    pub kernarg_segment_alignment: u8,
    pub group_segment_alignment: u8,
    pub private_segment_alignment: u8,
    /// Power-of-two exponent: 6 means wave64.
    pub wavefront_size: u8,
    pub call_convention: i32,
    pub runtime_loader_kernel_symbol: u64,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }
}

impl KernelCodeHeader {
    /// Parse the header from the first 256 bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, CodeObjectError> {
        if buf.len() < KERNEL_CODE_HEADER_LEN {
            return Err(CodeObjectError::ShortKernelCode(buf.len()));
        }
        let mut c = Cursor {
            buf: &buf[..KERNEL_CODE_HEADER_LEN],
            pos: 0,
        };
        let mut h = KernelCodeHeader {
            kernel_code_version_major: c.u32(),
            kernel_code_version_minor: c.u32(),
            machine_kind: c.u16(),
            machine_version_major: c.u16(),
            machine_version_minor: c.u16(),
            machine_version_stepping: c.u16(),
            kernel_code_entry_byte_offset: c.i64(),
            kernel_code_prefetch_byte_offset: c.i64(),
            kernel_code_prefetch_byte_size: c.u64(),
            ..Default::default()
        };
        c.skip(8); // max_scratch_backing_memory_byte_size (reserved)
        h.compute_pgm_resource_registers = c.u64();
        h.code_properties = c.u32();
        h.workitem_private_segment_byte_size = c.u32();
        h.workgroup_group_segment_byte_size = c.u32();
        h.gds_segment_byte_size = c.u32();
        h.kernarg_segment_byte_size = c.u64();
        h.workgroup_fbarrier_count = c.u32();
        h.wavefront_sgpr_count = c.u16();
        h.workitem_vgpr_count = c.u16();
        h.reserved_vgpr_first = c.u16();
        h.reserved_vgpr_count = c.u16();
        h.reserved_sgpr_first = c.u16();
        h.reserved_sgpr_count = c.u16();
        h.debug_wavefront_private_segment_offset_sgpr = c.u16();
        h.debug_private_segment_buffer_sgpr = c.u16();
        h.kernarg_segment_alignment = c.u8();
        h.group_segment_alignment = c.u8();
        h.private_segment_alignment = c.u8();
        h.wavefront_size = c.u8();
        h.call_convention = c.i32();
        c.skip(12);
        h.runtime_loader_kernel_symbol = c.u64();
        // Remaining 128 bytes are control directives.
        Ok(h)
    }

    /// Lanes per wavefront.
    pub fn wavefront_lanes(&self) -> u32 {
        1u32.checked_shl(u32::from(self.wavefront_size)).unwrap_or(0)
    }

    /// `compute_pgm_resource_registers`, decoded.
    pub fn pgm_resources(&self) -> PgmResources {
        PgmResources::decode(self.compute_pgm_resource_registers)
    }

    /// `code_properties`, decoded.
    pub fn code_props(&self) -> CodeProperties {
        CodeProperties::decode(self.code_properties)
    }
}

/// Split kernel code into its header and the machine code after it.
pub fn split_kernel_code(text: &[u8]) -> Result<(KernelCodeHeader, &[u8]), CodeObjectError> {
    let header = KernelCodeHeader::parse(text)?;
    Ok((header, &text[KERNEL_CODE_HEADER_LEN..]))
}
