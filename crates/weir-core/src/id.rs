//! Strongly-typed identifiers.
//!
//! Constraint, variable and action identifiers are generational handles
//! issued by a [`HandleTable`](crate::HandleTable): the upper 32 bits hold
//! the slot index and the lower 32 bits the slot generation, so a handle to
//! a destroyed object never resolves to whatever reuses its slot.

use crate::handle::Handle;
use std::fmt;

fn split(raw: u64) -> (u32, u32) {
    ((raw >> 32) as u32, raw as u32)
}

/// Identifies a constraint (a shared capacity) in a max-min system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl Handle for ConstraintId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = split(self.0);
        write!(f, "c{slot}.{generation}")
    }
}

/// Identifies a variable (one activity's claim on capacity) in a max-min
/// system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl Handle for VariableId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = split(self.0);
        write!(f, "v{slot}.{generation}")
    }
}

/// Identifies an action.
///
/// Stays valid until the last reference to the action is released; after
/// that every lookup through the stale handle reports the action as gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl Handle for ActionId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = split(self.0);
        write!(f, "a{slot}.{generation}")
    }
}

/// Identifies a resource model registered with a kernel.
///
/// `ModelId(n)` is the n-th model registered; models are driven in this
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ModelId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Model-local resource index (a host, a link, a disk).
///
/// Only meaningful together with the [`ModelId`] that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ResourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies one trace stream inside a history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
