//! Simulation driver for the weir kernel.
//!
//! A [`Kernel`] owns the max-min network, the action table, the trace
//! history, the registered [`ResourceModel`]s and the simulated clock.
//! Each [`Kernel::solve`] call is one discrete-event step: ask every model
//! for its earliest completion, merge that with the next trace event,
//! apply the external events that fall inside the step, advance the clock
//! and charge progress to the running actions.
//!
//! | Module | Contents |
//! |---|---|
//! | [`kernel`] | [`Kernel`], the driver |
//! | [`model`] | [`ResourceModel`], the per-kind plug-in interface |
//! | [`context`] | [`ModelContext`], what a model sees during a call |
//! | [`config`] | [`KernelConfig`] and its validation |
//! | [`metrics`] | [`SolveMetrics`] for the most recent step |
//! | [`error`] | [`ModelError`], [`KernelError`] |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod kernel;
pub mod metrics;
pub mod model;

pub use config::{ConfigError, KernelConfig};
pub use context::ModelContext;
pub use error::{KernelError, ModelError};
pub use kernel::Kernel;
pub use metrics::SolveMetrics;
pub use model::ResourceModel;
