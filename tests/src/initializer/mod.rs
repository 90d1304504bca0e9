//! Capability initializer tests against fake providers.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use gpudis_core::{
    ensure_ready, ActivationError, CapabilityFlags, CapabilityInitializer, CapabilityProvider,
    Family, InitError, InitState, Phase, Stage,
};

/// Provider that records every call, optionally failing one stage
/// or sleeping inside each activation.
#[derive(Default)]
pub(crate) struct FakeProvider {
    calls: Mutex<Vec<(Stage, Family)>>,
    counts: [AtomicUsize; 3],
    fail_at: Option<Stage>,
    delay: Option<Duration>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn count(&self, stage: Stage) -> usize {
        self.counts[stage as usize].load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<(Stage, Family)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn stages_called(&self) -> Vec<Stage> {
        self.calls().into_iter().map(|(s, _)| s).collect()
    }

    fn record(&self, stage: Stage, family: &Family) -> Result<(), ActivationError> {
        self.counts[stage as usize].fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push((stage, family.clone()));
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail_at == Some(stage) {
            return Err(ActivationError::Unsupported {
                family: family.clone(),
            });
        }
        Ok(())
    }
}

impl CapabilityProvider for FakeProvider {
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError> {
        self.record(Stage::Metadata, family)
    }

    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError> {
        self.record(Stage::MachineModel, family)
    }

    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError> {
        self.record(Stage::Decoder, family)
    }
}

#[test]
fn all_stages_succeed() {
    let state = InitState::new();
    let provider = FakeProvider::new();

    assert_eq!(state.snapshot(), CapabilityFlags::NONE);
    assert!(!state.is_ready());

    ensure_ready(&state, &provider, &Family::AMDGPU).unwrap();

    assert_eq!(state.snapshot(), CapabilityFlags::ALL);
    assert!(state.is_ready());
    assert_eq!(state.snapshot().phase(), Phase::DecoderActive);
}

#[test]
fn stages_activate_in_dependency_order() {
    let state = InitState::new();
    let provider = FakeProvider::new();
    ensure_ready(&state, &provider, &Family::AMDGPU).unwrap();

    assert_eq!(
        provider.calls(),
        vec![
            (Stage::Metadata, Family::AMDGPU),
            (Stage::MachineModel, Family::AMDGPU),
            (Stage::Decoder, Family::AMDGPU),
        ]
    );
}

#[test]
fn repeated_calls_activate_once() {
    let state = InitState::new();
    let provider = FakeProvider::new();

    ensure_ready(&state, &provider, &Family::AMDGPU).unwrap();
    let after_first = state.snapshot();
    for _ in 0..9 {
        ensure_ready(&state, &provider, &Family::AMDGPU).unwrap();
    }

    assert_eq!(state.snapshot(), after_first);
    for stage in Stage::ALL {
        assert_eq!(provider.count(stage), 1, "{stage} activated more than once");
    }
}

#[test]
fn machine_model_failure_stops_before_decoder() {
    let state = InitState::new();
    let provider = FakeProvider::failing_at(Stage::MachineModel);

    let err = ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();

    assert_eq!(err.stage(), Stage::MachineModel);
    assert_eq!(err.family(), &Family::AMDGPU);
    assert_eq!(
        state.snapshot(),
        CapabilityFlags {
            metadata: true,
            machine_model: false,
            decoder: false,
        }
    );
    assert!(!state.is_ready());
    assert_eq!(provider.count(Stage::Decoder), 0);
}

#[test]
fn metadata_failure_leaves_everything_inactive() {
    let state = InitState::new();
    let provider = FakeProvider::failing_at(Stage::Metadata);

    let err = ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();

    assert_eq!(
        err,
        InitError::InitializationFailed {
            family: Family::AMDGPU,
            stage: Stage::Metadata,
            source: ActivationError::Unsupported {
                family: Family::AMDGPU,
            },
        }
    );
    assert_eq!(state.snapshot(), CapabilityFlags::NONE);
    assert_eq!(provider.stages_called(), vec![Stage::Metadata]);
}

#[test]
fn decoder_failure_keeps_earlier_stages() {
    let state = InitState::new();
    let provider = FakeProvider::failing_at(Stage::Decoder);

    let err = ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();

    assert_eq!(err.stage(), Stage::Decoder);
    assert_eq!(state.snapshot().phase(), Phase::MachineModelActive);
    assert!(state.snapshot().is_ordered());
}

#[test]
fn later_call_skips_stages_already_active() {
    let state = InitState::new();
    let failing = FakeProvider::failing_at(Stage::MachineModel);
    ensure_ready(&state, &failing, &Family::AMDGPU).unwrap_err();

    // A corrected provider only sees the stages that never succeeded.
    let fixed = FakeProvider::new();
    ensure_ready(&state, &fixed, &Family::AMDGPU).unwrap();

    assert_eq!(fixed.stages_called(), vec![Stage::MachineModel, Stage::Decoder]);
    assert!(state.is_ready());
}

#[test]
fn failed_call_is_not_retried_internally() {
    let state = InitState::new();
    let provider = FakeProvider::failing_at(Stage::MachineModel);

    ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();
    assert_eq!(provider.count(Stage::MachineModel), 1);

    ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();
    assert_eq!(provider.count(Stage::Metadata), 1);
    assert_eq!(provider.count(Stage::MachineModel), 2);
    assert_eq!(provider.count(Stage::Decoder), 0);
}

#[test]
fn error_message_names_stage_and_family() {
    let state = InitState::new();
    let provider = FakeProvider::failing_at(Stage::MachineModel);
    let err = ensure_ready(&state, &provider, &Family::AMDGPU).unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to activate machine-model capability for AMDGPU"
    );
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(
        source.to_string(),
        "toolkit was built without support for AMDGPU"
    );
}

#[test]
fn initializer_tracks_families_independently() {
    let other: Family = "R600".parse().unwrap();
    let init = CapabilityInitializer::new(FakeProvider::new());

    init.ensure_ready(&Family::AMDGPU).unwrap();
    assert!(init.is_ready(&Family::AMDGPU));
    assert!(!init.is_ready(&other));
    assert_eq!(init.snapshot(&other), CapabilityFlags::NONE);

    init.ensure_ready(&other).unwrap();
    init.ensure_ready(&Family::AMDGPU).unwrap();

    let provider = init.provider();
    for stage in Stage::ALL {
        assert_eq!(provider.count(stage), 2);
    }
    assert_eq!(init.families(), vec![Family::AMDGPU, other]);
}

#[test]
fn queries_do_not_create_family_state() {
    let other: Family = "R600".parse().unwrap();
    let init = CapabilityInitializer::new(FakeProvider::new());

    assert!(!init.is_ready(&other));
    assert_eq!(init.snapshot(&other), CapabilityFlags::NONE);
    assert!(init.families().is_empty());

    init.ensure_ready(&Family::AMDGPU).unwrap();
    assert!(!init.is_ready(&other));
    assert_eq!(init.snapshot(&Family::AMDGPU), CapabilityFlags::ALL);
    assert_eq!(init.families(), vec![Family::AMDGPU]);
}

#[test]
fn initializer_hands_out_shared_state() {
    let init = CapabilityInitializer::new(FakeProvider::new());
    let state = init.state(&Family::AMDGPU);
    assert!(!state.is_ready());

    init.ensure_ready(&Family::AMDGPU).unwrap();
    assert!(state.is_ready());
}

#[test]
fn provider_behind_reference_and_box() {
    let provider = FakeProvider::new();
    let init = CapabilityInitializer::new(&provider);
    init.ensure_ready(&Family::AMDGPU).unwrap();
    assert_eq!(provider.count(Stage::Decoder), 1);

    let boxed: Box<dyn CapabilityProvider> = Box::new(FakeProvider::new());
    let state = InitState::new();
    ensure_ready(&state, &boxed, &Family::AMDGPU).unwrap();
    assert!(state.is_ready());
}
