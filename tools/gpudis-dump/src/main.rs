//! gpudis-dump: GPU code object → assembly listing.
//!
//! Reads a code object (or raw machine code), prints the kernel code
//! header and kernel arguments, brings up decode capability for the
//! configured instruction-set family, and prints one line per
//! instruction.

use std::env;
use std::error::Error as _;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use gpudis_core::{CapabilityInitializer, Family};
use gpudis_disas::code_object::{self, split_kernel_code};
use gpudis_disas::{
    amdgpu, kernel_args, DisasConfig, Disassembler, KernelArg, KernelMetaError, Toolkit,
};
use tracing_subscriber::EnvFilter;

struct Args {
    input: String,
    config: Option<PathBuf>,
    family: Option<String>,
    triple: Option<String>,
    cpu: Option<String>,
    raw: bool,
    no_header: bool,
}

const USAGE: &str = "\
usage: gpudis-dump <file> [options]

Options:
  --config <file>    TOML config (family, triple, cpu, skip_kernel_header)
  --family <name>    Instruction-set family (default: AMDGPU)
  --triple <triple>  Target triple (default: amdgcn--amdhsa)
  --cpu <name>       Processor (default: gfx900)
  --raw              Input is raw machine code, not ELF
  --no-header        Do not treat the first 256 bytes as amd_kernel_code_t
  -h, --help         Show this help

Set RUST_LOG=debug to trace capability activation.";

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("{USAGE}");
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let mut a = Args {
        input: args[1].clone(),
        config: None,
        family: None,
        triple: None,
        cpu: None,
        raw: false,
        no_header: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => a.config = Some(PathBuf::from(option_value(&args, &mut i))),
            "--family" => a.family = Some(option_value(&args, &mut i)),
            "--triple" => a.triple = Some(option_value(&args, &mut i)),
            "--cpu" => a.cpu = Some(option_value(&args, &mut i)),
            "--raw" => a.raw = true,
            "--no-header" => a.no_header = true,
            other => {
                eprintln!("unknown option: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }
    a
}

fn option_value(args: &[String], i: &mut usize) -> String {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("missing value for {}", args[*i - 1]);
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Config file first, then command-line overrides.
fn resolve_config(args: &Args) -> DisasConfig {
    let mut cfg = match &args.config {
        Some(path) => DisasConfig::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => DisasConfig::default(),
    };
    if let Some(name) = &args.family {
        cfg.family = name.parse::<Family>().unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        });
    }
    if let Some(triple) = &args.triple {
        cfg.triple = triple.clone();
    }
    if let Some(cpu) = &args.cpu {
        cfg.cpu = cpu.clone();
    }
    if args.no_header {
        cfg.skip_kernel_header = false;
    }
    cfg
}

fn print_kernel_args(out: &mut impl Write, kernargs: &[KernelArg]) {
    if kernargs.is_empty() {
        return;
    }
    writeln!(out, "kernel arguments:").expect("write failed");
    for arg in kernargs {
        writeln!(
            out,
            "  [{:#06x}] {} (size {}, align {})",
            arg.offset, arg.name, arg.size, arg.align
        )
        .expect("write failed");
    }
}

fn main() {
    init_tracing();
    let args = parse_args();
    let cfg = resolve_config(&args);

    let data = fs::read(&args.input).unwrap_or_else(|e| {
        let p = &args.input;
        eprintln!("failed to read {p}: {e}");
        process::exit(1);
    });

    let (text_addr, text, kernargs) = if args.raw {
        (0, data, Vec::new())
    } else {
        let obj = code_object::CodeObject::parse(&data).unwrap_or_else(|e| {
            eprintln!("ELF parse error: {e}");
            process::exit(1);
        });
        if obj.e_machine != amdgpu::EM_AMDGPU {
            tracing::warn!(e_machine = obj.e_machine, "code object is not AMDGPU");
        }
        let section = obj.text().unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        });
        let kernargs = match kernel_args(&obj) {
            Ok(list) => list,
            Err(KernelMetaError::MissingNote) => {
                tracing::warn!("code object has no .note metadata; kernel arguments unknown");
                Vec::new()
            }
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        };
        (section.addr, section.data.clone(), kernargs)
    };

    let mut out = BufWriter::new(io::stdout().lock());

    let (code_addr, code) = if cfg.skip_kernel_header {
        let (header, code) = split_kernel_code(&text).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        });
        writeln!(out, "{header:#?}").expect("write failed");
        writeln!(out, "{:#?}", header.pgm_resources()).expect("write failed");
        writeln!(out, "{:#?}", header.code_props()).expect("write failed");
        // Addresses wrap like the listing does.
        (
            text_addr.wrapping_add(code_object::KERNEL_CODE_HEADER_LEN as u64),
            code,
        )
    } else {
        (text_addr, &text[..])
    };

    print_kernel_args(&mut out, &kernargs);

    let toolkit = Toolkit::builtin();
    let registry = toolkit.registry().clone();
    let init = CapabilityInitializer::new(toolkit);
    if let Err(e) = init.ensure_ready(&cfg.family) {
        match e.source() {
            Some(cause) => eprintln!("{e}: {cause}"),
            None => eprintln!("{e}"),
        }
        process::exit(1);
    }

    let disasm = Disassembler::new(&registry, &cfg.triple, &cfg.cpu).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    eprintln!("target: {} ({})", disasm.family(), disasm.cpu());

    for line in disasm.disassemble(code_addr, code) {
        writeln!(out, "{:8x}  {}", line.addr, line.text).expect("write failed");
    }
    out.flush().expect("flush failed");
}
