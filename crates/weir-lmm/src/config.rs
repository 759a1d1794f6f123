//! Solver configuration.

/// Tuning switches for a [`MaxMinSystem`](crate::MaxMinSystem).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Re-solve only the components touched since the previous solve.
    ///
    /// Default: `false` (every solve recomputes the whole system). Both
    /// modes produce bit-identical values.
    pub selective_update: bool,
}

impl SolverConfig {
    /// A config with selective update enabled.
    pub fn selective() -> Self {
        Self {
            selective_update: true,
        }
    }
}
