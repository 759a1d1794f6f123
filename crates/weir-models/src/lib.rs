//! Reference resource models for the weir kernel.
//!
//! Each model implements [`ResourceModel`](weir_engine::ResourceModel) and
//! is registered with a [`Kernel`](weir_engine::Kernel); model-specific
//! operations are reached through
//! [`Kernel::with_model`](weir_engine::Kernel::with_model).
//!
//! | Model | Resources | Actions |
//! |---|---|---|
//! | [`CpuModel`] | hosts with a peak power | `execute`, `sleep` |
//! | [`NetworkModel`] | links with bandwidth and latency | `communicate` over a route |
//! | [`ConstantNetworkModel`] | none | `communicate` with a fixed latency |
//! | [`TimerModel`] | one per pending timer | none; fired commands are drained |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod constant;
pub mod cpu;
pub mod network;
pub mod timer;

pub use constant::ConstantNetworkModel;
pub use cpu::{CpuModel, Host};
pub use network::{Link, NetworkModel};
pub use timer::TimerModel;
