//! Decode capability bring-up.
//!
//! Before any instruction of a GPU instruction-set family can be
//! decoded, the toolkit must have registered three layers for it:
//! instruction-set metadata, the machine-code model, and the decoder.
//! This crate activates those layers exactly once, in that order,
//! from any number of threads, behind a provider trait so the real
//! toolkit can be swapped for a fake in tests.

pub mod error;
pub mod family;
pub mod initializer;
pub mod provider;
pub mod stage;
pub mod state;

pub use error::{ActivationError, InitError};
pub use family::{Family, FamilyParseError};
pub use initializer::{ensure_ready, CapabilityInitializer};
pub use provider::CapabilityProvider;
pub use stage::{CapabilityFlags, Phase, Stage};
pub use state::InitState;
