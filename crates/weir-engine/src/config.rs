//! Kernel configuration and validation.
//!
//! [`KernelConfig`] is the constructor input for [`Kernel`](crate::Kernel).
//! [`validate()`](KernelConfig::validate) is run by
//! [`Kernel::new`](crate::Kernel::new) and rejects settings that would make
//! the run helpers loop without bound.

use std::error::Error;
use std::fmt;
use weir_lmm::SolverConfig;

// ── KernelConfig ───────────────────────────────────────────────────

/// Settings for one simulation kernel.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    /// Re-solve only the connected components touched since the last
    /// solve. Values are identical either way. Default: `false`.
    pub selective_update: bool,
    /// Upper bound on the number of steps one call to
    /// [`run_until`](crate::Kernel::run_until) or
    /// [`run_until_terminal`](crate::Kernel::run_until_terminal) may take.
    /// Default: 10 000 000.
    pub max_steps_per_run: u64,
    /// Number of consecutive zero-length steps after which the driver
    /// reports a stall. Default: 10 000.
    pub max_zero_steps: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            selective_update: false,
            max_steps_per_run: 10_000_000,
            max_zero_steps: 10_000,
        }
    }
}

impl KernelConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps_per_run == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if self.max_zero_steps == 0 {
            return Err(ConfigError::ZeroStallThreshold);
        }
        Ok(())
    }

    /// The solver settings this configuration implies.
    pub fn solver(&self) -> SolverConfig {
        SolverConfig {
            selective_update: self.selective_update,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`KernelConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `max_steps_per_run` is zero.
    ZeroStepBudget,
    /// `max_zero_steps` is zero.
    ZeroStallThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroStepBudget => write!(f, "max_steps_per_run must be at least 1"),
            Self::ZeroStallThreshold => write!(f, "max_zero_steps must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
