//! The constraint/variable network.

use crate::config::SolverConfig;
use crate::error::LmmError;
use crate::solve::{self, CnstWork, SolveStats, VarWork, Workspace};
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::debug;
use weir_core::numeric::EPSILON;
use weir_core::{ConstraintId, HandleTable, VariableId};

/// How a constraint aggregates the consumption of its variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SharingPolicy {
    /// Usage is the sum of `coefficient × value` (a shared link, a CPU).
    #[default]
    Shared,
    /// Usage is the maximum of `coefficient × value`: every variable may use
    /// the full capacity on its own (a backbone modeled as infinitely wide
    /// but rate-limited per flow).
    Fatpipe,
}

/// One link between a variable and a constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Element {
    /// Constraint consumed.
    pub constraint: ConstraintId,
    /// Capacity consumed per unit of the variable's value.
    pub coefficient: f64,
}

#[derive(Clone, Debug)]
struct Constraint {
    bound: f64,
    policy: SharingPolicy,
    active: bool,
    usage: f64,
    /// Enabled variables with an element here, with their coefficients.
    attached: IndexMap<VariableId, f64>,
}

#[derive(Clone, Debug)]
struct Variable {
    weight: f64,
    bound: Option<f64>,
    value: f64,
    disabled: bool,
    elements: SmallVec<[Element; 4]>,
}

/// A set of constraints and variables solved for max-min fairness.
///
/// Constraints and variables are iterated in insertion order, which makes
/// every solve deterministic for identical input.
#[derive(Clone, Debug, Default)]
pub struct MaxMinSystem {
    config: SolverConfig,
    constraints: HandleTable<ConstraintId, Constraint>,
    constraint_order: IndexSet<ConstraintId>,
    variables: HandleTable<VariableId, Variable>,
    variable_order: IndexSet<VariableId>,
    modified: bool,
    touched_constraints: IndexSet<ConstraintId>,
    touched_variables: IndexSet<VariableId>,
    last_stats: SolveStats,
}

fn check_bound(bound: f64) -> Result<f64, LmmError> {
    if bound.is_finite() && bound >= 0.0 {
        Ok(bound)
    } else {
        Err(LmmError::NegativeBound { bound })
    }
}

fn check_coefficient(coefficient: f64) -> Result<f64, LmmError> {
    if coefficient.is_finite() && coefficient >= 0.0 {
        Ok(coefficient)
    } else {
        Err(LmmError::InvalidCoefficient { coefficient })
    }
}

impl MaxMinSystem {
    /// Create an empty system.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The configuration this system was built with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    // ── Constraints ─────────────────────────────────────────────

    /// Add a constraint with capacity `bound`.
    pub fn new_constraint(
        &mut self,
        bound: f64,
        policy: SharingPolicy,
    ) -> Result<ConstraintId, LmmError> {
        let bound = check_bound(bound)?;
        let id = self.constraints.insert(Constraint {
            bound,
            policy,
            active: true,
            usage: 0.0,
            attached: IndexMap::new(),
        });
        self.constraint_order.insert(id);
        Ok(id)
    }

    /// Destroy a constraint, detaching every element that points at it.
    pub fn free_constraint(&mut self, id: ConstraintId) -> Result<(), LmmError> {
        let cnst = self
            .constraints
            .remove(id)
            .ok_or(LmmError::UnknownConstraint(id))?;
        self.constraint_order.shift_remove(&id);
        self.touched_constraints.shift_remove(&id);
        for &var_id in cnst.attached.keys() {
            if let Some(var) = self.variables.get_mut(var_id) {
                var.elements.retain(|e| e.constraint != id);
            }
            self.touch_variable(var_id);
        }
        // Disabled variables keep their elements off the attached list.
        for &var_id in &self.variable_order {
            if let Some(var) = self.variables.get_mut(var_id) {
                if var.disabled {
                    var.elements.retain(|e| e.constraint != id);
                }
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Change the capacity of a constraint.
    pub fn update_constraint_bound(&mut self, id: ConstraintId, bound: f64) -> Result<(), LmmError> {
        let bound = check_bound(bound)?;
        let cnst = self.constraint_mut(id)?;
        if cnst.bound != bound {
            cnst.bound = bound;
            self.touch_constraint(id);
        }
        Ok(())
    }

    /// Mark a constraint's resource as available or not.
    ///
    /// Availability does not change the solved shares; models read it to
    /// fail the actions that depend on an unavailable resource.
    pub fn set_constraint_active(&mut self, id: ConstraintId, active: bool) -> Result<(), LmmError> {
        self.constraint_mut(id)?.active = active;
        Ok(())
    }

    /// Whether a constraint's resource is available.
    pub fn is_constraint_active(&self, id: ConstraintId) -> Result<bool, LmmError> {
        Ok(self.constraint(id)?.active)
    }

    /// Capacity of a constraint.
    pub fn constraint_bound(&self, id: ConstraintId) -> Result<f64, LmmError> {
        Ok(self.constraint(id)?.bound)
    }

    /// Sharing policy of a constraint.
    pub fn constraint_policy(&self, id: ConstraintId) -> Result<SharingPolicy, LmmError> {
        Ok(self.constraint(id)?.policy)
    }

    /// Whether any enabled variable with positive weight and coefficient
    /// consumes this constraint.
    pub fn constraint_used(&self, id: ConstraintId) -> Result<bool, LmmError> {
        let cnst = self.constraint(id)?;
        Ok(cnst.attached.iter().any(|(&var_id, &coefficient)| {
            coefficient > 0.0
                && self
                    .variables
                    .get(var_id)
                    .is_some_and(|var| var.weight > 0.0)
        }))
    }

    /// Aggregate consumption of a constraint, solving first if needed.
    pub fn usage(&mut self, id: ConstraintId) -> Result<f64, LmmError> {
        self.constraint(id)?;
        self.solve();
        Ok(self.constraint(id)?.usage)
    }

    /// Constraints in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraint_order.iter().copied()
    }

    /// Number of live constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ── Variables ───────────────────────────────────────────────

    /// Add a variable.
    ///
    /// `bound` is the variable's own rate cap (`None` for unbounded).
    /// `expected_elements` sizes the element list up front.
    pub fn new_variable(
        &mut self,
        weight: f64,
        bound: Option<f64>,
        expected_elements: usize,
    ) -> Result<VariableId, LmmError> {
        if !weight.is_finite() {
            return Err(LmmError::InvalidWeight { weight });
        }
        let bound = bound.map(check_bound).transpose()?;
        let id = self.variables.insert(Variable {
            weight,
            bound,
            value: 0.0,
            disabled: false,
            elements: SmallVec::with_capacity(expected_elements),
        });
        self.variable_order.insert(id);
        self.touch_variable(id);
        Ok(id)
    }

    /// Destroy a variable and all of its elements.
    pub fn free_variable(&mut self, id: VariableId) -> Result<(), LmmError> {
        let var = self.variables.remove(id).ok_or(LmmError::UnknownVariable(id))?;
        self.variable_order.shift_remove(&id);
        self.touched_variables.shift_remove(&id);
        for element in &var.elements {
            if let Some(cnst) = self.constraints.get_mut(element.constraint) {
                if cnst.attached.shift_remove(&id).is_some() {
                    self.touched_constraints.insert(element.constraint);
                }
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Set the element between `cnst` and `var` to `coefficient`, creating
    /// it if needed.
    pub fn expand(
        &mut self,
        cnst: ConstraintId,
        var: VariableId,
        coefficient: f64,
    ) -> Result<(), LmmError> {
        self.expand_with(cnst, var, coefficient, |_, new| new)
    }

    /// Add `coefficient` to the element between `cnst` and `var`, creating
    /// it if needed.
    pub fn expand_add(
        &mut self,
        cnst: ConstraintId,
        var: VariableId,
        coefficient: f64,
    ) -> Result<(), LmmError> {
        self.expand_with(cnst, var, coefficient, |old, new| old + new)
    }

    fn expand_with(
        &mut self,
        cnst_id: ConstraintId,
        var_id: VariableId,
        coefficient: f64,
        combine: impl Fn(f64, f64) -> f64,
    ) -> Result<(), LmmError> {
        let coefficient = check_coefficient(coefficient)?;
        check_bound(self.constraint(cnst_id)?.bound)?;
        let var = self
            .variables
            .get_mut(var_id)
            .ok_or(LmmError::UnknownVariable(var_id))?;
        let combined = match var.elements.iter_mut().find(|e| e.constraint == cnst_id) {
            Some(element) => {
                element.coefficient = combine(element.coefficient, coefficient);
                element.coefficient
            }
            None => {
                var.elements.push(Element {
                    constraint: cnst_id,
                    coefficient,
                });
                coefficient
            }
        };
        let disabled = var.disabled;
        if !disabled {
            let cnst = self.constraint_mut(cnst_id)?;
            cnst.attached.insert(var_id, combined);
        }
        self.touch_constraint(cnst_id);
        self.touch_variable(var_id);
        Ok(())
    }

    /// Change a variable's weight. Zero or negative weight excludes it from
    /// solving (its value becomes 0) without detaching it.
    pub fn update_variable_weight(&mut self, id: VariableId, weight: f64) -> Result<(), LmmError> {
        if !weight.is_finite() {
            return Err(LmmError::InvalidWeight { weight });
        }
        let var = self.variable_mut(id)?;
        if var.weight != weight {
            var.weight = weight;
            self.touch_variable_and_constraints(id);
        }
        Ok(())
    }

    /// Change a variable's own rate cap.
    pub fn update_variable_bound(&mut self, id: VariableId, bound: Option<f64>) -> Result<(), LmmError> {
        let bound = bound.map(check_bound).transpose()?;
        let var = self.variable_mut(id)?;
        if var.bound != bound {
            var.bound = bound;
            self.touch_variable_and_constraints(id);
        }
        Ok(())
    }

    /// Exclude a variable from solving. Its value is 0 from now on.
    pub fn disable_variable(&mut self, id: VariableId) -> Result<(), LmmError> {
        let var = self.variable_mut(id)?;
        if var.disabled {
            return Ok(());
        }
        var.disabled = true;
        var.value = 0.0;
        let elements = var.elements.clone();
        for element in &elements {
            if let Some(cnst) = self.constraints.get_mut(element.constraint) {
                cnst.attached.shift_remove(&id);
            }
            self.touched_constraints.insert(element.constraint);
        }
        self.touch_variable(id);
        Ok(())
    }

    /// Re-attach a disabled variable to its constraints.
    pub fn enable_variable(&mut self, id: VariableId) -> Result<(), LmmError> {
        let var = self.variable_mut(id)?;
        if !var.disabled {
            return Ok(());
        }
        var.disabled = false;
        let elements = var.elements.clone();
        for element in &elements {
            if let Some(cnst) = self.constraints.get_mut(element.constraint) {
                cnst.attached.insert(id, element.coefficient);
            }
            self.touched_constraints.insert(element.constraint);
        }
        self.touch_variable(id);
        Ok(())
    }

    /// Solved value of a variable, solving first if the system is dirty.
    pub fn value(&mut self, id: VariableId) -> Result<f64, LmmError> {
        self.variable(id)?;
        self.solve();
        Ok(self.variable(id)?.value)
    }

    /// Value from the last solve, without solving.
    ///
    /// Disabled variables always read 0.
    pub fn solved_value(&self, id: VariableId) -> Result<f64, LmmError> {
        Ok(self.variable(id)?.value)
    }

    /// Weight of a variable.
    pub fn variable_weight(&self, id: VariableId) -> Result<f64, LmmError> {
        Ok(self.variable(id)?.weight)
    }

    /// Own rate cap of a variable.
    pub fn variable_bound(&self, id: VariableId) -> Result<Option<f64>, LmmError> {
        Ok(self.variable(id)?.bound)
    }

    /// Whether a variable is disabled.
    pub fn is_disabled(&self, id: VariableId) -> Result<bool, LmmError> {
        Ok(self.variable(id)?.disabled)
    }

    /// Elements of a variable, in the order they were created.
    pub fn elements(&self, id: VariableId) -> Result<&[Element], LmmError> {
        Ok(&self.variable(id)?.elements)
    }

    /// Variables in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.variable_order.iter().copied()
    }

    /// Number of live variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    // ── Solving ─────────────────────────────────────────────────

    /// Whether a mutation happened since the last solve.
    pub fn is_dirty(&self) -> bool {
        self.modified
    }

    /// Counters from the most recent solve that did work.
    pub fn last_stats(&self) -> &SolveStats {
        &self.last_stats
    }

    /// Recompute the values of everything touched since the last solve.
    ///
    /// A no-op when nothing changed, so repeated calls are idempotent.
    pub fn solve(&mut self) {
        if !self.modified {
            return;
        }
        let (mut cnst_scope, mut var_scope) = if self.config.selective_update {
            self.selective_scope()
        } else {
            (self.constraint_order.clone(), self.variable_order.clone())
        };
        // Workspace positions must line up with scope positions.
        cnst_scope.retain(|id| self.constraints.contains(*id));
        var_scope.retain(|id| self.variables.contains(*id));

        let mut ws = Workspace::default();
        for &var_id in &var_scope {
            if let Some(var) = self.variables.get(var_id) {
                ws.vars.push(VarWork {
                    weight: var.weight,
                    bound: var.bound,
                    value: 0.0,
                    fixed: var.disabled || var.weight <= 0.0,
                    elems: SmallVec::new(),
                });
            }
        }
        for (ci, &cnst_id) in cnst_scope.iter().enumerate() {
            let Some(cnst) = self.constraints.get(cnst_id) else {
                continue;
            };
            ws.cnsts.push(CnstWork {
                policy: cnst.policy,
                remaining: cnst.bound,
                usage: 0.0,
                live: Vec::new(),
                unresolved: 0,
            });
            for (&var_id, &coefficient) in &cnst.attached {
                let Some(vi) = var_scope.get_index_of(&var_id) else {
                    continue;
                };
                if coefficient > 0.0 && !ws.vars[vi].fixed {
                    ws.link(ci, vi, coefficient);
                }
            }
        }

        let (rounds, fixed) = solve::fill(&mut ws);

        for (vi, &var_id) in var_scope.iter().enumerate() {
            if let Some(var) = self.variables.get_mut(var_id) {
                var.value = if var.disabled || var.weight <= 0.0 {
                    0.0
                } else {
                    ws.vars[vi].value
                };
            }
        }
        for &cnst_id in &cnst_scope {
            self.refresh_usage(cnst_id);
        }

        self.last_stats = SolveStats {
            constraints_in_scope: cnst_scope.len(),
            variables_in_scope: var_scope.len(),
            rounds,
            variables_fixed: fixed,
        };
        debug!(
            constraints = cnst_scope.len(),
            variables = var_scope.len(),
            rounds,
            fixed,
            "max-min solve"
        );
        self.modified = false;
        self.touched_constraints.clear();
        self.touched_variables.clear();
    }

    fn refresh_usage(&mut self, id: ConstraintId) {
        let Some(cnst) = self.constraints.get(id) else {
            return;
        };
        let mut usage: f64 = 0.0;
        for (&var_id, &coefficient) in &cnst.attached {
            let value = self.variables.get(var_id).map_or(0.0, |v| v.value);
            match cnst.policy {
                SharingPolicy::Shared => usage += coefficient * value,
                SharingPolicy::Fatpipe => usage = usage.max(coefficient * value),
            }
        }
        debug_assert!(
            usage <= cnst.bound + EPSILON + cnst.bound * 1e-9,
            "constraint {id} over capacity: usage {usage} > bound {}",
            cnst.bound
        );
        if let Some(cnst) = self.constraints.get_mut(id) {
            cnst.usage = usage;
        }
    }

    /// Constraints and variables connected to anything touched since the
    /// last solve, in global insertion order.
    fn selective_scope(&self) -> (IndexSet<ConstraintId>, IndexSet<VariableId>) {
        let mut cnsts: IndexSet<ConstraintId> = IndexSet::new();
        let mut vars: IndexSet<VariableId> = IndexSet::new();
        let mut queue: Vec<ConstraintId> = Vec::new();

        for &cnst_id in &self.touched_constraints {
            if self.constraints.contains(cnst_id) && cnsts.insert(cnst_id) {
                queue.push(cnst_id);
            }
        }
        for &var_id in &self.touched_variables {
            let Some(var) = self.variables.get(var_id) else {
                continue;
            };
            vars.insert(var_id);
            if var.disabled {
                continue;
            }
            for element in &var.elements {
                if cnsts.insert(element.constraint) {
                    queue.push(element.constraint);
                }
            }
        }
        while let Some(cnst_id) = queue.pop() {
            let Some(cnst) = self.constraints.get(cnst_id) else {
                continue;
            };
            for &var_id in cnst.attached.keys() {
                if !vars.insert(var_id) {
                    continue;
                }
                if let Some(var) = self.variables.get(var_id) {
                    for element in &var.elements {
                        if cnsts.insert(element.constraint) {
                            queue.push(element.constraint);
                        }
                    }
                }
            }
        }

        cnsts.sort_by(|a, b| {
            self.constraint_order
                .get_index_of(a)
                .cmp(&self.constraint_order.get_index_of(b))
        });
        vars.sort_by(|a, b| {
            self.variable_order
                .get_index_of(a)
                .cmp(&self.variable_order.get_index_of(b))
        });
        (cnsts, vars)
    }

    // ── Internals ───────────────────────────────────────────────

    fn constraint(&self, id: ConstraintId) -> Result<&Constraint, LmmError> {
        self.constraints.get(id).ok_or(LmmError::UnknownConstraint(id))
    }

    fn constraint_mut(&mut self, id: ConstraintId) -> Result<&mut Constraint, LmmError> {
        self.constraints.get_mut(id).ok_or(LmmError::UnknownConstraint(id))
    }

    fn variable(&self, id: VariableId) -> Result<&Variable, LmmError> {
        self.variables.get(id).ok_or(LmmError::UnknownVariable(id))
    }

    fn variable_mut(&mut self, id: VariableId) -> Result<&mut Variable, LmmError> {
        self.variables.get_mut(id).ok_or(LmmError::UnknownVariable(id))
    }

    fn touch_constraint(&mut self, id: ConstraintId) {
        self.touched_constraints.insert(id);
        self.modified = true;
    }

    fn touch_variable(&mut self, id: VariableId) {
        self.touched_variables.insert(id);
        self.modified = true;
    }

    fn touch_variable_and_constraints(&mut self, id: VariableId) {
        if let Some(var) = self.variables.get(id) {
            if !var.disabled {
                for element in &var.elements {
                    self.touched_constraints.insert(element.constraint);
                }
            }
        }
        self.touch_variable(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_are_rejected() {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(1.0, SharingPolicy::Shared).unwrap();
        let v = sys.new_variable(1.0, None, 1).unwrap();
        sys.free_constraint(c).unwrap();
        sys.free_variable(v).unwrap();
        assert_eq!(sys.constraint_bound(c), Err(LmmError::UnknownConstraint(c)));
        assert_eq!(sys.value(v), Err(LmmError::UnknownVariable(v)));
        assert_eq!(sys.free_variable(v), Err(LmmError::UnknownVariable(v)));
    }

    #[test]
    fn negative_bounds_are_configuration_errors() {
        let mut sys = MaxMinSystem::default();
        assert!(matches!(
            sys.new_constraint(-1.0, SharingPolicy::Shared),
            Err(LmmError::NegativeBound { .. })
        ));
        assert!(matches!(
            sys.new_variable(1.0, Some(-2.0), 0),
            Err(LmmError::NegativeBound { .. })
        ));
        let c = sys.new_constraint(5.0, SharingPolicy::Shared).unwrap();
        let v = sys.new_variable(1.0, None, 1).unwrap();
        assert!(matches!(
            sys.expand(c, v, -0.5),
            Err(LmmError::InvalidCoefficient { .. })
        ));
        assert!(sys.update_constraint_bound(c, f64::NAN).is_err());
    }

    #[test]
    fn expand_replaces_and_expand_add_accumulates() {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(12.0, SharingPolicy::Shared).unwrap();
        let v = sys.new_variable(1.0, None, 1).unwrap();
        sys.expand(c, v, 1.0).unwrap();
        sys.expand(c, v, 2.0).unwrap();
        assert_eq!(sys.elements(v).unwrap()[0].coefficient, 2.0);
        assert_eq!(sys.value(v).unwrap(), 6.0);
        sys.expand_add(c, v, 1.0).unwrap();
        assert_eq!(sys.elements(v).unwrap().len(), 1);
        assert_eq!(sys.value(v).unwrap(), 4.0);
    }

    #[test]
    fn reads_pull_a_solve_when_dirty() {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(8.0, SharingPolicy::Shared).unwrap();
        let v = sys.new_variable(1.0, None, 1).unwrap();
        sys.expand(c, v, 1.0).unwrap();
        assert!(sys.is_dirty());
        assert_eq!(sys.solved_value(v).unwrap(), 0.0);
        assert_eq!(sys.value(v).unwrap(), 8.0);
        assert!(!sys.is_dirty());
        sys.update_constraint_bound(c, 2.0).unwrap();
        assert_eq!(sys.solved_value(v).unwrap(), 8.0);
        assert_eq!(sys.usage(c).unwrap(), 2.0);
    }

    #[test]
    fn constraint_used_ignores_zero_weight() {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(1.0, SharingPolicy::Shared).unwrap();
        assert!(!sys.constraint_used(c).unwrap());
        let v = sys.new_variable(0.0, None, 1).unwrap();
        sys.expand(c, v, 1.0).unwrap();
        assert!(!sys.constraint_used(c).unwrap());
        sys.update_variable_weight(v, 1.0).unwrap();
        assert!(sys.constraint_used(c).unwrap());
        sys.disable_variable(v).unwrap();
        assert!(!sys.constraint_used(c).unwrap());
    }

    #[test]
    fn availability_does_not_dirty_the_system() {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(1.0, SharingPolicy::Shared).unwrap();
        sys.solve();
        sys.set_constraint_active(c, false).unwrap();
        assert!(!sys.is_dirty());
        assert!(!sys.is_constraint_active(c).unwrap());
    }

    #[test]
    fn freeing_a_constraint_releases_its_capacity_claims() {
        let mut sys = MaxMinSystem::default();
        let wide = sys.new_constraint(10.0, SharingPolicy::Shared).unwrap();
        let narrow = sys.new_constraint(1.0, SharingPolicy::Shared).unwrap();
        let v = sys.new_variable(1.0, None, 2).unwrap();
        sys.expand(wide, v, 1.0).unwrap();
        sys.expand(narrow, v, 1.0).unwrap();
        assert_eq!(sys.value(v).unwrap(), 1.0);
        sys.free_constraint(narrow).unwrap();
        assert_eq!(sys.elements(v).unwrap().len(), 1);
        assert_eq!(sys.value(v).unwrap(), 10.0);
    }
}
