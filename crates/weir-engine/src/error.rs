//! Errors raised by resource models and by the driver.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt;
use weir_action::ActionError;
use weir_core::{ModelId, ResourceId, Signal};
use weir_lmm::LmmError;
use weir_trace::TraceError;

// ── ModelError ─────────────────────────────────────────────────────

/// Error returned by a [`ResourceModel`](crate::ResourceModel) hook or
/// helper.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// The model does not implement the requested operation.
    Unimplemented {
        /// Name of the model.
        model: String,
        /// The operation that was asked for.
        operation: &'static str,
    },
    /// The resource index is not known to the model.
    UnknownResource(ResourceId),
    /// A trace drove a signal the model has no use for.
    UnsupportedSignal {
        /// The resource the event targeted.
        resource: ResourceId,
        /// The signal.
        signal: Signal,
    },
    /// A model-specific argument was out of range.
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },
    /// The network rejected an operation.
    Lmm(LmmError),
    /// The action table rejected an operation.
    Action(ActionError),
    /// A trace could not be attached.
    Trace(TraceError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unimplemented { model, operation } => {
                write!(f, "model '{model}' does not implement {operation}")
            }
            Self::UnknownResource(id) => write!(f, "unknown resource {id}"),
            Self::UnsupportedSignal { resource, signal } => {
                write!(f, "resource {resource} cannot be driven by a {signal} trace")
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Lmm(e) => write!(f, "network: {e}"),
            Self::Action(e) => write!(f, "action: {e}"),
            Self::Trace(e) => write!(f, "trace: {e}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lmm(e) => Some(e),
            Self::Action(e) => Some(e),
            Self::Trace(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LmmError> for ModelError {
    fn from(e: LmmError) -> Self {
        Self::Lmm(e)
    }
}

impl From<ActionError> for ModelError {
    fn from(e: ActionError) -> Self {
        Self::Action(e)
    }
}

impl From<TraceError> for ModelError {
    fn from(e: TraceError) -> Self {
        Self::Trace(e)
    }
}

// ── KernelError ────────────────────────────────────────────────────

/// Error returned by [`Kernel`](crate::Kernel) operations.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// A model hook failed.
    Model {
        /// Name of the failing model.
        model: String,
        /// The underlying error.
        source: ModelError,
    },
    /// An action operation was rejected.
    Action(ActionError),
    /// A trace could not be attached.
    Trace(TraceError),
    /// The network rejected an operation.
    Lmm(LmmError),
    /// No model is registered under this id.
    UnknownModel(ModelId),
    /// The model under this id is not of the requested type.
    ModelTypeMismatch {
        /// The model id.
        model: ModelId,
        /// The requested type.
        expected: &'static str,
    },
    /// Too many consecutive steps made no progress in time.
    Stalled {
        /// Clock at which the stall was detected.
        clock: f64,
        /// Number of zero-length steps in a row.
        steps: u32,
    },
    /// A run helper exhausted its step budget.
    StepLimit {
        /// The budget.
        steps: u64,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Model { model, source } => write!(f, "model '{model}': {source}"),
            Self::Action(e) => write!(f, "action: {e}"),
            Self::Trace(e) => write!(f, "trace: {e}"),
            Self::Lmm(e) => write!(f, "network: {e}"),
            Self::UnknownModel(id) => write!(f, "unknown model {id}"),
            Self::ModelTypeMismatch { model, expected } => {
                write!(f, "model {model} is not a {expected}")
            }
            Self::Stalled { clock, steps } => {
                write!(f, "no progress at clock {clock} after {steps} zero-length steps")
            }
            Self::StepLimit { steps } => write!(f, "step budget of {steps} exhausted"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Model { source, .. } => Some(source),
            Self::Action(e) => Some(e),
            Self::Trace(e) => Some(e),
            Self::Lmm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for KernelError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ActionError> for KernelError {
    fn from(e: ActionError) -> Self {
        Self::Action(e)
    }
}

impl From<TraceError> for KernelError {
    fn from(e: TraceError) -> Self {
        Self::Trace(e)
    }
}

impl From<LmmError> for KernelError {
    fn from(e: LmmError) -> Self {
        Self::Lmm(e)
    }
}
