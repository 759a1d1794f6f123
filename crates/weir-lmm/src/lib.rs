//! Linear max-min fair sharing for the weir kernel.
//!
//! A [`MaxMinSystem`] holds constraints (capacities) and variables (claims
//! on capacity) wired together by weighted elements. Solving assigns every
//! variable its max-min fair share by progressive filling: the most
//! contended constraint is saturated first, the shares of everything
//! bottlenecked there are fixed, and the process repeats on what is left.
//!
//! Reads are pull-based. Any mutation marks the system dirty and the next
//! [`MaxMinSystem::value`] or [`MaxMinSystem::usage`] call re-solves first.
//! With [`SolverConfig::selective_update`] only the connected components
//! touched since the last solve are recomputed; the values are identical to
//! a full solve.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
mod solve;
pub mod system;

pub use config::SolverConfig;
pub use error::LmmError;
pub use solve::SolveStats;
pub use system::{Element, MaxMinSystem, SharingPolicy};
