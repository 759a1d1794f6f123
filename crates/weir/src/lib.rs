//! Weir: a discrete-event kernel for simulating activities that share
//! capacity-limited resources.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! weir sub-crates. For most users, adding `weir` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use weir::prelude::*;
//!
//! let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
//! let cpu = kernel.add_model(CpuModel::new());
//!
//! // Two computations on a 1 Gflop/s host share it evenly.
//! let (a, b) = kernel
//!     .with_model::<CpuModel, _>(cpu, |m, ctx| {
//!         let host = m.add_host(ctx, "alpha", 1e9)?;
//!         Ok((m.execute(ctx, host, 1e9)?, m.execute(ctx, host, 3e9)?))
//!     })
//!     .unwrap();
//!
//! assert_eq!(kernel.run_until_terminal(a).unwrap(), ActionState::Done);
//! assert_eq!(kernel.current_clock(), 2.0);
//! assert_eq!(kernel.run_until_terminal(b).unwrap(), ActionState::Done);
//! assert_eq!(kernel.current_clock(), 4.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `weir-core` | IDs, handle tables, trace events, numeric tolerance |
//! | [`lmm`] | `weir-lmm` | Constraint/variable network and the max-min solver |
//! | [`action`] | `weir-action` | Action lifecycle and per-state lists |
//! | [`trace`] | `weir-trace` | Availability traces and the future event set |
//! | [`engine`] | `weir-engine` | Resource model trait and the discrete-event driver |
//! | [`models`] | `weir-models` | Reference CPU, network and timer models |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`weir-core`).
///
/// Contains the typed identifiers, the generational [`types::HandleTable`],
/// [`types::TraceEvent`] and the [`types::EPSILON`] tolerance helpers.
pub use weir_core as types;

/// Constraint/variable network (`weir-lmm`).
///
/// [`lmm::MaxMinSystem`] holds the network and computes max-min fair
/// shares, fully or selectively.
pub use weir_lmm as lmm;

/// Action lifecycle (`weir-action`).
///
/// [`action::ActionTable`] owns every action and moves it between the
/// `Ready`, `Running`, `Done` and `Failed` lists.
pub use weir_action as action;

/// Traces and the future event set (`weir-trace`).
///
/// Build [`trace::Trace`]s in code or parse them from text, then attach
/// them to a [`trace::History`] through the kernel.
pub use weir_trace as trace;

/// The driver (`weir-engine`).
///
/// [`engine::Kernel`] drives every registered [`engine::ResourceModel`].
pub use weir_engine as engine;

/// Reference resource models (`weir-models`).
pub use weir_models as models;

/// Common imports for typical weir usage.
///
/// ```rust
/// use weir::prelude::*;
/// ```
///
/// This imports the kernel, the model trait and its context, the action
/// types, traces, and the reference models.
pub mod prelude {
    // Core types
    pub use weir_core::{ActionId, ModelId, ResourceHandle, ResourceId, Signal, TraceEvent};

    // Solver
    pub use weir_lmm::{MaxMinSystem, SharingPolicy, SolverConfig};

    // Actions
    pub use weir_action::{Action, ActionSpec, ActionState};

    // Traces
    pub use weir_trace::{parse::parse_trace, Trace};

    // Errors
    pub use weir_action::ActionError;
    pub use weir_engine::{KernelError, ModelError};
    pub use weir_lmm::LmmError;
    pub use weir_trace::TraceError;

    // Engine
    pub use weir_engine::{Kernel, KernelConfig, ModelContext, ResourceModel, SolveMetrics};

    // Models
    pub use weir_models::{ConstantNetworkModel, CpuModel, NetworkModel, TimerModel};
}
