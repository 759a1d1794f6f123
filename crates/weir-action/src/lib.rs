//! Action lifecycle for the weir kernel.
//!
//! An action is the externally visible activity (a computation, a transfer)
//! built on one solver variable. It carries the work bookkeeping (`cost`,
//! `remains`, `max_duration`) and a small state machine:
//!
//! ```text
//! Ready ──start──▶ Running ──remains exhausted / max_duration──▶ Done
//!   │                 │ ▲
//!   │            suspend resume          resource inactive / cancel
//!   │                 ▼ │                        │
//!   └────cancel───────┴─┴────────────────────────▶ Failed
//!
//! any state ──unref to zero──▶ ToFree (destroyed, then NotInSystem)
//! ```
//!
//! [`ActionTable`] owns every action in a generational handle table and
//! indexes them by `(model, state)` so that "everything that just finished"
//! is enumerated without scanning.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod error;
mod sets;
pub mod table;

pub use action::{Action, ActionSpec, ActionState};
pub use error::ActionError;
pub use table::{ActionTable, Transition};
