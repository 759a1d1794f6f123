//! Action operation errors.

use crate::action::ActionState;
use std::error::Error;
use std::fmt;
use weir_core::ActionId;
use weir_lmm::LmmError;

/// An action operation was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionError {
    /// The handle does not refer to a live action.
    UnknownAction(ActionId),
    /// The operation is not allowed from the action's current state.
    InvalidTransition {
        /// The action.
        action: ActionId,
        /// Its state when the operation was attempted.
        from: ActionState,
        /// The rejected operation.
        operation: &'static str,
    },
    /// Cost was negative or not finite.
    InvalidCost {
        /// The rejected cost.
        cost: f64,
    },
    /// Maximum duration was negative or not finite.
    InvalidDuration {
        /// The rejected duration.
        duration: f64,
    },
    /// Wiring the underlying variable failed.
    Lmm(LmmError),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction(id) => write!(f, "unknown action {id}"),
            Self::InvalidTransition {
                action,
                from,
                operation,
            } => write!(f, "cannot {operation} action {action} while {from}"),
            Self::InvalidCost { cost } => {
                write!(f, "cost must be finite and non-negative, got {cost}")
            }
            Self::InvalidDuration { duration } => {
                write!(f, "max duration must be finite and non-negative, got {duration}")
            }
            Self::Lmm(e) => write!(f, "solver wiring: {e}"),
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lmm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LmmError> for ActionError {
    fn from(e: LmmError) -> Self {
        Self::Lmm(e)
    }
}
