//! Configuration errors raised while wiring a max-min system.

use std::error::Error;
use std::fmt;
use weir_core::{ConstraintId, VariableId};

/// Malformed constraint/variable wiring.
///
/// These are setup errors: a simulation that hits one must not start.
#[derive(Clone, Debug, PartialEq)]
pub enum LmmError {
    /// A capacity or rate bound was negative or not finite.
    NegativeBound {
        /// The rejected value.
        bound: f64,
    },
    /// An element coefficient was negative or not finite.
    InvalidCoefficient {
        /// The rejected value.
        coefficient: f64,
    },
    /// A variable weight was not finite.
    InvalidWeight {
        /// The rejected value.
        weight: f64,
    },
    /// The constraint handle is stale or was never issued.
    UnknownConstraint(ConstraintId),
    /// The variable handle is stale or was never issued.
    UnknownVariable(VariableId),
}

impl fmt::Display for LmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeBound { bound } => {
                write!(f, "bound must be finite and non-negative, got {bound}")
            }
            Self::InvalidCoefficient { coefficient } => {
                write!(f, "coefficient must be finite and non-negative, got {coefficient}")
            }
            Self::InvalidWeight { weight } => write!(f, "weight must be finite, got {weight}"),
            Self::UnknownConstraint(id) => write!(f, "unknown constraint {id}"),
            Self::UnknownVariable(id) => write!(f, "unknown variable {id}"),
        }
    }
}

impl Error for LmmError {}
