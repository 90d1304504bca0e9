//! Kernel argument layout from code-object metadata.
//!
//! Code object v2 carries the runtime metadata as YAML text inside
//! the `.note` section, after a binary note header. Only the `Args:`
//! list of the first kernel is read; each argument's offset in the
//! kernarg segment is its running offset rounded up to `Align`.

use thiserror::Error;
use tracing::debug;

use crate::code_object::CodeObject;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelMetaError {
    #[error("missing .note section with kernel metadata")]
    MissingNote,
    #[error("metadata line {line}: argument field outside of an argument entry")]
    OrphanField { line: usize },
    #[error("kernel argument {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("kernel argument {index}: invalid {field} {value:?}")]
    BadValue {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("kernel argument {index}: kernarg offset overflows")]
    OffsetOverflow { index: usize },
}

/// One kernel argument and where it lives in the kernarg segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelArg {
    /// `Name`, or `ValueKind` for unnamed (hidden) arguments.
    pub name: String,
    pub value_kind: Option<String>,
    pub size: u32,
    pub align: u32,
    pub offset: u32,
}

/// Kernel arguments of the code object's `.note` metadata.
pub fn kernel_args(obj: &CodeObject) -> Result<Vec<KernelArg>, KernelMetaError> {
    let note = obj
        .section(".note")
        .ok_or(KernelMetaError::MissingNote)?;
    extract_kernel_args(&note.data)
}

/// Parse the `Args:` list out of raw `.note` section bytes.
///
/// Bytes up to the first newline belong to the note header and are
/// skipped. A note without an `Args:` list yields no arguments.
pub fn extract_kernel_args(note: &[u8]) -> Result<Vec<KernelArg>, KernelMetaError> {
    let start = note
        .iter()
        .position(|&b| b == b'\n')
        .map_or(note.len(), |p| p + 1);
    let text: Vec<u8> = note[start..].iter().copied().filter(|&b| b != 0).collect();
    let text = String::from_utf8_lossy(&text);

    let mut entries: Vec<Vec<(&str, &str)>> = Vec::new();
    let mut args_indent = None;
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - trimmed.len();
        let Some(base) = args_indent else {
            if trimmed.trim_end() == "Args:" {
                args_indent = Some(indent);
            }
            continue;
        };
        if indent <= base {
            break;
        }

        let field = match trimmed.strip_prefix("- ") {
            Some(rest) => {
                entries.push(Vec::new());
                rest
            }
            None => trimmed,
        };
        let Some(entry) = entries.last_mut() else {
            return Err(KernelMetaError::OrphanField { line: lineno + 1 });
        };
        if let Some((key, value)) = field.split_once(':') {
            entry.push((key.trim(), unquote(value.trim())));
        }
    }

    let mut offset = 0u32;
    let mut args = Vec::with_capacity(entries.len());
    for (index, fields) in entries.iter().enumerate() {
        let get = |key: &str| fields.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
        let number = |key: &'static str| -> Result<u32, KernelMetaError> {
            let raw = get(key).ok_or(KernelMetaError::MissingField { index, field: key })?;
            raw.parse().map_err(|_| KernelMetaError::BadValue {
                index,
                field: key,
                value: raw.to_string(),
            })
        };

        let value_kind = get("ValueKind").map(str::to_string);
        let name = get("Name")
            .map(str::to_string)
            .or_else(|| value_kind.clone())
            .ok_or(KernelMetaError::MissingField {
                index,
                field: "Name",
            })?;
        let size = number("Size")?;
        let align = number("Align")?;
        if !align.is_power_of_two() {
            return Err(KernelMetaError::BadValue {
                index,
                field: "Align",
                value: align.to_string(),
            });
        }

        let arg_offset = offset
            .checked_next_multiple_of(align)
            .ok_or(KernelMetaError::OffsetOverflow { index })?;
        offset = arg_offset
            .checked_add(size)
            .ok_or(KernelMetaError::OffsetOverflow { index })?;
        args.push(KernelArg {
            name,
            value_kind,
            size,
            align,
            offset: arg_offset,
        });
    }

    debug!(count = args.len(), kernarg_bytes = offset, "parsed kernel arguments");
    Ok(args)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .unwrap_or(value)
}
