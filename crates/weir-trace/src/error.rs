//! Errors from building traces and scheduling them.

use std::error::Error;
use std::fmt;

/// A trace could not be built, parsed or attached.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceError {
    /// A point's time offset was negative or not finite.
    InvalidDelta {
        /// Index of the offending point.
        index: usize,
        /// The rejected offset.
        delta: f64,
    },
    /// Absolute dates went backwards.
    NonMonotonicDate {
        /// Index of the offending point.
        index: usize,
        /// Date of the previous point.
        previous: f64,
        /// The offending date.
        date: f64,
    },
    /// The period does not leave room for the trace's own span.
    InvalidPeriod {
        /// The rejected period.
        period: f64,
        /// Time from the trace start to its last point.
        span: f64,
    },
    /// A loop count of zero was requested.
    ZeroLoopCount,
    /// The start date was negative, not finite, or before the current clock.
    InvalidStartDate {
        /// The rejected start date.
        start: f64,
    },
    /// A text trace could not be parsed.
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDelta { index, delta } => {
                write!(f, "point {index} has invalid time offset {delta}")
            }
            Self::NonMonotonicDate {
                index,
                previous,
                date,
            } => write!(f, "point {index} at {date} precedes previous point at {previous}"),
            Self::InvalidPeriod { period, span } => {
                write!(f, "period {period} must be positive and exceed trace span {span}")
            }
            Self::ZeroLoopCount => write!(f, "loop count must be at least 1"),
            Self::InvalidStartDate { start } => write!(f, "invalid trace start date {start}"),
            Self::Parse { line, reason } => write!(f, "line {line}: {reason}"),
        }
    }
}

impl Error for TraceError {}
