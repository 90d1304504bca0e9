use thiserror::Error;

use crate::family::Family;
use crate::stage::Stage;

/// Failure reported by one activation primitive of the toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// The family is not compiled into the linked toolkit.
    #[error("toolkit was built without support for {family}")]
    Unsupported { family: Family },
    /// The toolkit refused because an earlier stage is not registered.
    #[error("{stage} stage is not registered")]
    MissingPrerequisite { stage: Stage },
    /// Another family already claims this target triple.
    #[error("target triple {triple} is already registered for {owner}")]
    DuplicateTriple { triple: String, owner: Family },
    #[error("{0}")]
    Toolkit(String),
}

/// Returned by `ensure_ready` when a stage could not be activated.
///
/// Not retried: activation failure reflects a build or configuration
/// mismatch, not a transient condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("failed to activate {stage} capability for {family}")]
    InitializationFailed {
        family: Family,
        stage: Stage,
        #[source]
        source: ActivationError,
    },
}

impl InitError {
    /// Stage whose activation failed.
    pub fn stage(&self) -> Stage {
        match self {
            InitError::InitializationFailed { stage, .. } => *stage,
        }
    }

    pub fn family(&self) -> &Family {
        match self {
            InitError::InitializationFailed { family, .. } => family,
        }
    }
}
