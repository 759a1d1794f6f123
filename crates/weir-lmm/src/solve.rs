//! Progressive filling over a dense snapshot of the system.
//!
//! The system copies the constraints and variables in scope into a
//! [`Workspace`] indexed by position, runs [`fill`] on it and writes the
//! values back. Working on positions keeps the loop free of handle lookups
//! and borrow juggling.

use crate::system::SharingPolicy;
use smallvec::SmallVec;
use tracing::trace;
use weir_core::numeric::{double_update, snap};

/// Counters from the most recent solve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Constraints included in the solve.
    pub constraints_in_scope: usize,
    /// Variables included in the solve.
    pub variables_in_scope: usize,
    /// Filling rounds until no constraint had unresolved variables.
    pub rounds: usize,
    /// Variables fixed by a bottleneck or their own bound.
    pub variables_fixed: usize,
}

pub(crate) struct CnstWork {
    pub policy: SharingPolicy,
    pub remaining: f64,
    pub usage: f64,
    /// `(variable position, coefficient)` for every participating element.
    pub live: Vec<(usize, f64)>,
    pub unresolved: usize,
}

pub(crate) struct VarWork {
    pub weight: f64,
    pub bound: Option<f64>,
    pub value: f64,
    pub fixed: bool,
    /// `(constraint position, coefficient)`.
    pub elems: SmallVec<[(usize, f64); 4]>,
}

#[derive(Default)]
pub(crate) struct Workspace {
    pub cnsts: Vec<CnstWork>,
    pub vars: Vec<VarWork>,
}

impl Workspace {
    /// Register a participating element. Both sides must already be pushed.
    pub fn link(&mut self, ci: usize, vi: usize, coefficient: f64) {
        let cnst = &mut self.cnsts[ci];
        let var = &mut self.vars[vi];
        let share = coefficient / var.weight;
        match cnst.policy {
            SharingPolicy::Shared => cnst.usage += share,
            SharingPolicy::Fatpipe => cnst.usage = cnst.usage.max(share),
        }
        cnst.live.push((vi, coefficient));
        cnst.unresolved += 1;
        var.elems.push((ci, coefficient));
    }
}

fn recompute_usage(cnst: &mut CnstWork, vars: &[VarWork]) {
    let mut usage: f64 = 0.0;
    for &(vi, coefficient) in &cnst.live {
        let var = &vars[vi];
        if var.fixed {
            continue;
        }
        let share = coefficient / var.weight;
        match cnst.policy {
            SharingPolicy::Shared => usage += share,
            SharingPolicy::Fatpipe => usage = usage.max(share),
        }
    }
    cnst.usage = usage;
}

fn fix(ws: &mut Workspace, vi: usize, value: f64) {
    let Workspace { cnsts, vars } = ws;
    vars[vi].fixed = true;
    vars[vi].value = value;
    let weight = vars[vi].weight;
    trace!(variable = vi, value, "variable fixed");
    for k in 0..vars[vi].elems.len() {
        let (ci, coefficient) = vars[vi].elems[k];
        let cnst = &mut cnsts[ci];
        cnst.unresolved -= 1;
        if cnst.unresolved == 0 {
            cnst.usage = 0.0;
            if cnst.policy == SharingPolicy::Shared {
                double_update(&mut cnst.remaining, coefficient * value);
            }
            continue;
        }
        match cnst.policy {
            SharingPolicy::Shared => {
                double_update(&mut cnst.remaining, coefficient * value);
                cnst.usage -= coefficient / weight;
                if cnst.usage <= 0.0 {
                    recompute_usage(cnst, vars);
                }
            }
            SharingPolicy::Fatpipe => recompute_usage(cnst, vars),
        }
    }
}

/// Run progressive filling to completion and return the round count and
/// the number of variables fixed.
pub(crate) fn fill(ws: &mut Workspace) -> (usize, usize) {
    let mut active: Vec<usize> = (0..ws.cnsts.len())
        .filter(|&ci| ws.cnsts[ci].unresolved > 0)
        .collect();
    let mut ratios: Vec<f64> = Vec::with_capacity(active.len());
    let mut queued = vec![false; ws.vars.len()];
    let mut candidates: Vec<usize> = Vec::new();
    let mut rounds = 0;
    let mut fixed = 0;

    while !active.is_empty() {
        rounds += 1;

        ratios.clear();
        let mut min_ratio = f64::INFINITY;
        for &ci in &active {
            let cnst = &ws.cnsts[ci];
            let ratio = if cnst.usage > 0.0 {
                cnst.remaining.max(0.0) / cnst.usage
            } else {
                f64::INFINITY
            };
            ratios.push(ratio);
            if ratio < min_ratio {
                min_ratio = ratio;
            }
        }

        candidates.clear();
        for (k, &ci) in active.iter().enumerate() {
            if ratios[k] != min_ratio || !min_ratio.is_finite() {
                continue;
            }
            for &(vi, _) in &ws.cnsts[ci].live {
                if !ws.vars[vi].fixed && !queued[vi] {
                    queued[vi] = true;
                    candidates.push(vi);
                }
            }
        }

        if candidates.is_empty() {
            break;
        }

        let mut min_bound = f64::INFINITY;
        for &vi in &candidates {
            let var = &ws.vars[vi];
            if let Some(bound) = var.bound {
                let scaled = bound * var.weight;
                if scaled < min_bound {
                    min_bound = scaled;
                }
            }
        }

        for k in 0..candidates.len() {
            let vi = candidates[k];
            queued[vi] = false;
            let (weight, bound) = (ws.vars[vi].weight, ws.vars[vi].bound);
            if min_bound < min_ratio {
                // A candidate's own cap binds before the bottleneck does.
                if let Some(bound) = bound {
                    if bound * weight == min_bound {
                        fix(ws, vi, bound);
                        fixed += 1;
                    }
                }
            } else {
                fix(ws, vi, min_ratio / weight);
                fixed += 1;
            }
        }

        active.retain(|&ci| ws.cnsts[ci].unresolved > 0);
    }

    for var in &mut ws.vars {
        if !var.fixed {
            var.value = var.bound.unwrap_or(0.0);
            var.fixed = true;
        }
        var.value = snap(var.value);
    }
    (rounds, fixed)
}
