//! Core types for the weir discrete-event kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! typed handles shared by every layer, the generational [`HandleTable`]
//! that backs them, the numeric tolerance helpers used by the solver and
//! the driver, and the external trace event types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod event;
pub mod handle;
pub mod id;
pub mod numeric;

pub use event::{ResourceHandle, Signal, TraceEvent};
pub use handle::{Handle, HandleTable};
pub use id::{ActionId, ConstraintId, ModelId, ResourceId, StreamId, VariableId};
pub use numeric::{double_positive, double_update, snap, EPSILON};
