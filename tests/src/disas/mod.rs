//! Toolkit, registry and disassembly session tests.


use std::sync::Arc;

use gpudis_core::{ActivationError, CapabilityInitializer, CapabilityProvider, Family, Stage};
use gpudis_disas::amdgpu;
use gpudis_disas::{
    Decoded, DisasError, Disassembler, InstructionDecoder, Line, MachineModel, TargetInfo,
    TargetRegistry, Toolkit,
};

fn ready_toolkit() -> Arc<TargetRegistry> {
    let toolkit = Toolkit::builtin();
    let registry = Arc::clone(toolkit.registry());
    CapabilityInitializer::new(toolkit)
        .ensure_ready(&Family::AMDGPU)
        .unwrap();
    registry
}

fn words(ws: &[u32]) -> Vec<u8> {
    ws.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn builtin_ships_amdgpu() {
    let toolkit = Toolkit::builtin();
    assert!(toolkit.supports(&Family::AMDGPU));
    assert_eq!(toolkit.families(), vec![Family::AMDGPU]);
    assert!(toolkit.registry().families().is_empty());
}

#[test]
fn ensure_ready_registers_every_stage() {
    let registry = ready_toolkit();
    for stage in Stage::ALL {
        assert!(registry.is_registered(&Family::AMDGPU, stage), "{stage}");
    }
    let info = registry.info(&Family::AMDGPU).unwrap();
    assert_eq!(info.name, "amdgcn");
    assert_eq!(
        registry.family_for_triple("amdgcn-amd-amdhsa"),
        Some(Family::AMDGPU)
    );
    assert_eq!(registry.family_for_triple("x86_64-unknown-linux-gnu"), None);
}

#[test]
fn unsupported_family_fails_at_metadata() {
    let toolkit = Toolkit::builtin();
    let registry = Arc::clone(toolkit.registry());
    let init = CapabilityInitializer::new(toolkit);
    let family: Family = "NVPTX".parse().unwrap();

    let err = init.ensure_ready(&family).unwrap_err();

    assert_eq!(err.stage(), Stage::Metadata);
    assert!(registry.families().is_empty());
    assert!(!init.snapshot(&family).metadata);
}

#[test]
fn registry_refuses_out_of_order_registration() {
    let registry = TargetRegistry::new();
    assert_eq!(
        registry.register_machine_model(amdgpu::machine_model()),
        Err(ActivationError::MissingPrerequisite {
            stage: Stage::Metadata,
        })
    );

    registry.register_info(amdgpu::target_info()).unwrap();
    let bundle = amdgpu::bundle();
    assert_eq!(
        registry.register_decoder(&Family::AMDGPU, bundle.decoder),
        Err(ActivationError::MissingPrerequisite {
            stage: Stage::MachineModel,
        })
    );
    assert!(registry.is_registered(&Family::AMDGPU, Stage::Metadata));
    assert!(!registry.is_registered(&Family::AMDGPU, Stage::MachineModel));
}

#[test]
fn triples_belong_to_one_family() {
    let registry = TargetRegistry::new();
    registry.register_info(amdgpu::target_info()).unwrap();
    // Same family again is a no-op, not a clash.
    registry.register_info(amdgpu::target_info()).unwrap();

    let r600: Family = "R600".parse().unwrap();
    let clash = TargetInfo {
        family: r600.clone(),
        name: "r600",
        description: "pre-GCN AMD GPUs",
        triples: &["r600--", "amdgcn-amd-amdhsa"],
    };
    assert_eq!(
        registry.register_info(clash),
        Err(ActivationError::DuplicateTriple {
            triple: "amdgcn-amd-amdhsa".into(),
            owner: Family::AMDGPU,
        })
    );
    assert!(!registry.is_registered(&r600, Stage::Metadata));
    assert_eq!(
        registry.family_for_triple("amdgcn-amd-amdhsa"),
        Some(Family::AMDGPU)
    );

    let distinct = TargetInfo {
        family: r600.clone(),
        name: "r600",
        description: "pre-GCN AMD GPUs",
        triples: &["r600--"],
    };
    registry.register_info(distinct).unwrap();
    assert_eq!(registry.family_for_triple("r600--"), Some(r600));
}

#[test]
fn toolkit_primitives_are_idempotent() {
    let toolkit = Toolkit::builtin();
    for _ in 0..2 {
        for stage in Stage::ALL {
            toolkit.activate(stage, &Family::AMDGPU).unwrap();
        }
    }
    assert_eq!(toolkit.registry().families(), vec![Family::AMDGPU]);
}

#[test]
fn disassembler_requires_activation() {
    let registry = TargetRegistry::new();
    assert_eq!(
        Disassembler::new(&registry, "amdgcn--amdhsa", "gfx900").err(),
        Some(DisasError::UnknownTriple("amdgcn--amdhsa".into()))
    );

    registry.register_info(amdgpu::target_info()).unwrap();
    assert_eq!(
        Disassembler::new(&registry, "amdgcn--amdhsa", "gfx900").err(),
        Some(DisasError::NotReady {
            family: Family::AMDGPU,
            stage: Stage::MachineModel,
        })
    );

    registry
        .register_machine_model(amdgpu::machine_model())
        .unwrap();
    assert_eq!(
        Disassembler::new(&registry, "amdgcn--amdhsa", "gfx900").err(),
        Some(DisasError::NotReady {
            family: Family::AMDGPU,
            stage: Stage::Decoder,
        })
    );
}

#[test]
fn disassembler_checks_processor() {
    let registry = ready_toolkit();
    assert_eq!(
        Disassembler::new(&registry, "amdgcn--amdhsa", "gfx9000").err(),
        Some(DisasError::UnknownProcessor {
            family: Family::AMDGPU,
            cpu: "gfx9000".into(),
        })
    );

    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "").unwrap();
    assert_eq!(d.cpu(), amdgpu::DEFAULT_PROCESSOR);
    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "gfx1030").unwrap();
    assert_eq!(d.cpu(), "gfx1030");
    assert_eq!(d.family(), &Family::AMDGPU);
}

#[test]
fn raw_words_with_short_tail() {
    let registry = ready_toolkit();
    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "gfx900").unwrap();

    let mut code = words(&[0xbf81_0000, 0x7e00_0280]);
    code.extend_from_slice(&[0xaa, 0xbb]);
    let lines = d.disassemble(0x100, &code);

    assert_eq!(
        lines,
        vec![
            Line {
                addr: 0x100,
                len: 4,
                text: ".long 0xbf810000".into(),
            },
            Line {
                addr: 0x104,
                len: 4,
                text: ".long 0x7e000280".into(),
            },
            Line {
                addr: 0x108,
                len: 2,
                text: ".byte 0xaa, 0xbb".into(),
            },
        ]
    );
}

/// Understands two made-up encodings: `0xbf81_0000` (`s_endpgm`) and
/// any word with bit 31 clear followed by a literal dword.
struct ToyDecoder;

impl InstructionDecoder for ToyDecoder {
    fn decode(&self, _addr: u64, bytes: &[u8]) -> Option<Decoded> {
        let w = u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?);
        if w == 0xbf81_0000 {
            return Some(Decoded {
                text: "\ts_endpgm".into(),
                len: 4,
            });
        }
        if w == 0xffff_ffff {
            // Claims zero bytes; must not stall the walk.
            return Some(Decoded {
                text: "bogus".into(),
                len: 0,
            });
        }
        if w & 0x8000_0000 == 0 {
            let lit = u32::from_le_bytes(bytes.get(4..8)?.try_into().ok()?);
            return Some(Decoded {
                text: format!("\tv_mov_b32 v0, {lit:#x}"),
                len: 8,
            });
        }
        None
    }
}

fn toy_registry() -> Arc<TargetRegistry> {
    let bundle = amdgpu::bundle()
        .with_decoder(|_: &MachineModel, _: &str| Box::new(ToyDecoder) as Box<dyn InstructionDecoder>);
    let toolkit = Toolkit::empty().with_bundle(bundle);
    let registry = Arc::clone(toolkit.registry());
    CapabilityInitializer::new(toolkit)
        .ensure_ready(&Family::AMDGPU)
        .unwrap();
    registry
}

#[test]
fn plugged_decoder_engine() {
    let registry = toy_registry();
    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "gfx906").unwrap();

    let code = words(&[0x7e00_02ff, 0x42, 0xbf81_0000]);
    let text: Vec<(u64, String)> = d
        .disassemble(0, &code)
        .into_iter()
        .map(|l| (l.addr, l.text))
        .collect();

    assert_eq!(
        text,
        vec![
            (0, "v_mov_b32 v0, 0x42".to_string()),
            (8, "s_endpgm".to_string()),
        ]
    );
}

#[test]
fn undecodable_words_fall_back_to_bytes() {
    let registry = toy_registry();
    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "gfx906").unwrap();

    // Unknown word, zero-length claim, then a literal cut short.
    let code = words(&[0x8000_0001, 0xffff_ffff, 0x1234_5678]);
    let lines = d.disassemble(0x40, &code);

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].text, ".byte 0x01, 0x00, 0x00, 0x80");
    assert_eq!(lines[1].addr, 0x44);
    assert_eq!(lines[1].text, ".byte 0xff, 0xff, 0xff, 0xff");
    assert_eq!(lines[2].addr, 0x48);
    assert_eq!(lines[2].text, ".byte 0x78, 0x56, 0x34, 0x12");
    assert_eq!(lines.iter().map(|l| l.len).sum::<usize>(), code.len());
}

#[test]
fn empty_input_yields_no_lines() {
    let registry = ready_toolkit();
    let d = Disassembler::new(&registry, "amdgcn--amdhsa", "gfx900").unwrap();
    assert!(d.disassemble(0, &[]).is_empty());
}
