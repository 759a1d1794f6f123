//! Per-step metrics for the simulation driver.
//!
//! [`SolveMetrics`] captures what one [`Kernel::solve`](crate::Kernel::solve)
//! call did, for logging and profiling.

use weir_lmm::SolveStats;

/// What the most recent step did.
///
/// Durations are wall-clock microseconds; everything else is simulated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveMetrics {
    /// Wall-clock time for the whole step, in microseconds.
    pub step_us: u64,
    /// Simulated time the clock advanced by.
    pub elapsed: f64,
    /// Clock after the step.
    pub clock: f64,
    /// Trace events applied during the step.
    pub events_applied: u32,
    /// Actions that reached `Done`.
    pub actions_done: u32,
    /// Actions that reached `Failed`.
    pub actions_failed: u32,
    /// Counters from the most recent solver run.
    pub solver: SolveStats,
}
