//! External events produced by traces and consumed by the driver.

use crate::id::{ModelId, ResourceId};
use std::fmt;

/// Which property of a resource a trace drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Capacity scale (CPU power, link bandwidth). The value multiplies the
    /// nominal capacity.
    Capacity,
    /// Availability: a value > 0 turns the resource on, otherwise off.
    State,
    /// Link latency in simulated seconds.
    Latency,
    /// A model-defined wake-up with no resource semantics (timers).
    Wakeup,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Capacity => "capacity",
            Self::State => "state",
            Self::Latency => "latency",
            Self::Wakeup => "wakeup",
        };
        f.write_str(name)
    }
}

/// Addresses one traced property of one resource of one model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    /// Model that owns the resource.
    pub model: ModelId,
    /// Model-local resource index.
    pub resource: ResourceId,
    /// Property being driven.
    pub signal: Signal,
}

impl ResourceHandle {
    /// Build a handle.
    pub fn new(model: ModelId, resource: ResourceId, signal: Signal) -> Self {
        Self {
            model,
            resource,
            signal,
        }
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model {} resource {} ({})", self.model, self.resource, self.signal)
    }
}

/// One scheduled change of a resource property.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceEvent {
    /// Simulated date at which the change applies.
    pub date: f64,
    /// Target of the change.
    pub resource: ResourceHandle,
    /// New value.
    pub value: f64,
}
