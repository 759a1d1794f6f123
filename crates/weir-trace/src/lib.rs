//! Trace-driven external events.
//!
//! A [`Trace`] is an ordered, optionally periodic list of value changes.
//! Attaching it to a resource in a [`History`] turns it into a stream of
//! dated [`TraceEvent`](weir_core::TraceEvent)s that the driver merges with
//! solver-predicted completions.
//!
//! | Module | Contents |
//! |---|---|
//! | [`trace`] | [`Trace`], [`DatedValue`] |
//! | [`history`] | [`History`], the future event set |
//! | [`parse`] | text loader for the `time value` trace format |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod parse;
pub mod trace;

pub use error::TraceError;
pub use history::History;
pub use trace::{DatedValue, Trace};
