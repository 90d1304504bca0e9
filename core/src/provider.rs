use std::sync::Arc;

use crate::error::ActivationError;
use crate::family::Family;
use crate::stage::Stage;

/// The three ordered activation primitives supplied by the toolkit.
///
/// Each call is blocking and non-cancellable. Implementations are
/// only ever invoked for a stage after every earlier stage of the
/// same family succeeded, and at most once per successful stage
/// for a given initialization state.
pub trait CapabilityProvider: Send + Sync {
    /// Register instruction-set metadata for `family`.
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError>;

    /// Register the machine-code model for `family`.
    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError>;

    /// Register the decoder for `family`.
    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError>;

    /// Dispatch to the primitive for `stage`.
    fn activate(&self, stage: Stage, family: &Family) -> Result<(), ActivationError> {
        match stage {
            Stage::Metadata => self.activate_metadata(family),
            Stage::MachineModel => self.activate_machine_model(family),
            Stage::Decoder => self.activate_decoder(family),
        }
    }
}

impl<P: CapabilityProvider + ?Sized> CapabilityProvider for &P {
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_metadata(family)
    }

    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_machine_model(family)
    }

    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_decoder(family)
    }
}

impl<P: CapabilityProvider + ?Sized> CapabilityProvider for Box<P> {
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_metadata(family)
    }

    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_machine_model(family)
    }

    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_decoder(family)
    }
}

impl<P: CapabilityProvider + ?Sized> CapabilityProvider for Arc<P> {
    fn activate_metadata(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_metadata(family)
    }

    fn activate_machine_model(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_machine_model(family)
    }

    fn activate_decoder(&self, family: &Family) -> Result<(), ActivationError> {
        (**self).activate_decoder(family)
    }
}
