//! Owner of every action and its state-indexed sets.

use crate::action::{Action, ActionSpec, ActionState};
use crate::error::ActionError;
use crate::sets::StateSets;
use indexmap::IndexMap;
use tracing::{debug, trace};
use weir_core::numeric::double_update;
use weir_core::{ActionId, ConstraintId, HandleTable, ModelId, VariableId};
use weir_lmm::MaxMinSystem;

/// A state change applied by [`ActionTable::update_running`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// The action that moved.
    pub action: ActionId,
    /// Its new state.
    pub to: ActionState,
    /// Clock at which it moved.
    pub at: f64,
}

/// Every live action, indexed by `(model, state)`.
///
/// Handles are generational: once the last reference to an action is
/// released its handle goes stale and [`ActionTable::state`] reports
/// [`ActionState::NotInSystem`].
#[derive(Clone, Debug, Default)]
pub struct ActionTable {
    actions: HandleTable<ActionId, Action>,
    sets: IndexMap<ModelId, StateSets>,
}

fn check_duration(duration: Option<f64>) -> Result<Option<f64>, ActionError> {
    match duration {
        Some(d) if !d.is_finite() || d < 0.0 => Err(ActionError::InvalidDuration { duration: d }),
        other => Ok(other),
    }
}

fn resources_up(sys: &MaxMinSystem, var: VariableId) -> Result<bool, ActionError> {
    for element in sys.elements(var)? {
        if !sys.is_constraint_active(element.constraint)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl ActionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action is live.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The action behind `id`, if live.
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    /// State of `id`; stale handles are [`ActionState::NotInSystem`].
    pub fn state(&self, id: ActionId) -> ActionState {
        self.actions
            .get(id)
            .map_or(ActionState::NotInSystem, |a| a.state)
    }

    /// Actions of `model` currently in `state`, in the order they entered it.
    pub fn actions_in(
        &self,
        model: ModelId,
        state: ActionState,
    ) -> impl Iterator<Item = ActionId> + '_ {
        self.sets
            .get(&model)
            .and_then(|sets| sets.set(state))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Whether a running action of `model` has an element on `cnst`,
    /// whatever its weight. Suspended, sleeping and gated actions count.
    pub fn running_on(
        &self,
        sys: &MaxMinSystem,
        model: ModelId,
        cnst: ConstraintId,
    ) -> Result<bool, ActionError> {
        for id in self.actions_in(model, ActionState::Running) {
            let Some(action) = self.actions.get(id) else {
                continue;
            };
            if sys
                .elements(action.variable)?
                .iter()
                .any(|e| e.constraint == cnst)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of live actions owned by `model`.
    pub fn model_len(&self, model: ModelId) -> usize {
        self.sets.get(&model).map_or(0, StateSets::len)
    }

    // ── Creation and release ────────────────────────────────────

    /// Create a `Ready` action for `model` with one reference held by the
    /// caller. Its variable is wired but stays detached until
    /// [`start`](Self::start).
    pub fn create(
        &mut self,
        sys: &mut MaxMinSystem,
        model: ModelId,
        spec: ActionSpec,
    ) -> Result<ActionId, ActionError> {
        if !spec.cost.is_finite() || spec.cost < 0.0 {
            return Err(ActionError::InvalidCost { cost: spec.cost });
        }
        let max_duration = check_duration(spec.max_duration)?;
        let var = sys.new_variable(spec.priority, spec.bound, spec.consumes.len())?;
        let wired = sys.disable_variable(var).and_then(|()| {
            spec.consumes
                .iter()
                .try_for_each(|&(cnst, coefficient)| sys.expand_add(cnst, var, coefficient))
        });
        if let Err(e) = wired {
            let _ = sys.free_variable(var);
            return Err(e.into());
        }

        let id = self.actions.insert(Action {
            model,
            cost: spec.cost,
            remains: spec.cost,
            start_time: None,
            finish_time: None,
            max_duration,
            priority: spec.priority,
            bound: spec.bound,
            state: ActionState::Ready,
            suspended: false,
            gated: false,
            refcount: 1,
            variable: var,
            last_update: 0.0,
            tag: 0,
        });
        self.sets
            .entry(model)
            .or_default()
            .relocate(id, ActionState::NotInSystem, ActionState::Ready);
        trace!(action = %id, %model, cost = spec.cost, "action created");
        Ok(id)
    }

    /// Take one more reference.
    pub fn ref_action(&mut self, id: ActionId) -> Result<(), ActionError> {
        self.action_mut(id)?.refcount += 1;
        Ok(())
    }

    /// Release one reference. At zero the action and its variable are
    /// destroyed and `ToFree` is returned; otherwise the current state.
    pub fn unref(&mut self, sys: &mut MaxMinSystem, id: ActionId) -> Result<ActionState, ActionError> {
        let action = self.action_mut(id)?;
        action.refcount = action.refcount.saturating_sub(1);
        if action.refcount > 0 {
            return Ok(action.state);
        }
        let (model, state, var) = (action.model, action.state, action.variable);
        if let Some(sets) = self.sets.get_mut(&model) {
            sets.relocate(id, state, ActionState::ToFree);
        }
        self.actions.remove(id);
        sys.free_variable(var)?;
        trace!(action = %id, "action destroyed");
        Ok(ActionState::ToFree)
    }

    // ── Transitions ─────────────────────────────────────────────

    /// `Ready → Running`: attach the variable to its constraints.
    ///
    /// If a resource the action needs is already down the action fails on
    /// the spot; the returned state tells which.
    pub fn start(
        &mut self,
        sys: &mut MaxMinSystem,
        id: ActionId,
        now: f64,
    ) -> Result<ActionState, ActionError> {
        let action = self.action_mut(id)?;
        if action.state != ActionState::Ready {
            return Err(ActionError::InvalidTransition {
                action: id,
                from: action.state,
                operation: "start",
            });
        }
        action.start_time = Some(now);
        action.last_update = now;
        let (var, weight) = (action.variable, action.effective_weight());
        sys.update_variable_weight(var, weight)?;
        sys.enable_variable(var)?;
        self.relocate(id, ActionState::Running)?;
        if !resources_up(sys, var)? {
            self.finish(sys, id, ActionState::Failed, now)?;
        }
        Ok(self.state(id))
    }

    /// Freeze progress: the variable stays attached with weight 0.
    pub fn suspend(&mut self, sys: &mut MaxMinSystem, id: ActionId) -> Result<(), ActionError> {
        let action = self.running_mut(id, "suspend")?;
        if action.suspended {
            return Ok(());
        }
        action.suspended = true;
        let var = action.variable;
        sys.update_variable_weight(var, 0.0)?;
        Ok(())
    }

    /// Undo [`suspend`](Self::suspend).
    pub fn resume(&mut self, sys: &mut MaxMinSystem, id: ActionId) -> Result<(), ActionError> {
        let action = self.running_mut(id, "resume")?;
        if !action.suspended {
            return Ok(());
        }
        action.suspended = false;
        let (var, weight) = (action.variable, action.effective_weight());
        sys.update_variable_weight(var, weight)?;
        Ok(())
    }

    /// Hold the action at weight 0 on behalf of its model, or release it.
    ///
    /// Independent of consumer suspension: a gated action stays at weight 0
    /// when resumed, and an ungated one stays at 0 while suspended.
    pub fn set_gated(
        &mut self,
        sys: &mut MaxMinSystem,
        id: ActionId,
        gated: bool,
    ) -> Result<(), ActionError> {
        let action = self.action_mut(id)?;
        if action.gated == gated {
            return Ok(());
        }
        action.gated = gated;
        let (var, weight) = (action.variable, action.effective_weight());
        sys.update_variable_weight(var, weight)?;
        Ok(())
    }

    /// `{Ready, Running} → Failed`, detaching the variable immediately.
    pub fn cancel(&mut self, sys: &mut MaxMinSystem, id: ActionId, now: f64) -> Result<(), ActionError> {
        let state = self.action(id)?.state;
        if !matches!(state, ActionState::Ready | ActionState::Running) {
            return Err(ActionError::InvalidTransition {
                action: id,
                from: state,
                operation: "cancel",
            });
        }
        self.finish(sys, id, ActionState::Failed, now)
    }

    /// Move a live action into a terminal state at `now`.
    ///
    /// The variable is disabled so finished work stops consuming capacity.
    pub fn finish(
        &mut self,
        sys: &mut MaxMinSystem,
        id: ActionId,
        to: ActionState,
        now: f64,
    ) -> Result<(), ActionError> {
        let action = self.action_mut(id)?;
        if !to.is_terminal() || action.state.is_terminal() {
            return Err(ActionError::InvalidTransition {
                action: id,
                from: action.state,
                operation: "finish",
            });
        }
        action.finish_time = Some(now);
        let var = action.variable;
        sys.disable_variable(var)?;
        self.relocate(id, to)?;
        debug!(action = %id, state = %to, at = now, "action finished");
        Ok(())
    }

    // ── Parameters ──────────────────────────────────────────────

    /// Change the fairness weight.
    pub fn set_priority(
        &mut self,
        sys: &mut MaxMinSystem,
        id: ActionId,
        priority: f64,
    ) -> Result<(), ActionError> {
        let action = self.action_mut(id)?;
        let previous = action.priority;
        action.priority = priority;
        let (var, weight) = (action.variable, action.effective_weight());
        if let Err(e) = sys.update_variable_weight(var, weight) {
            self.action_mut(id)?.priority = previous;
            return Err(e.into());
        }
        Ok(())
    }

    /// Change the rate cap.
    pub fn set_bound(
        &mut self,
        sys: &mut MaxMinSystem,
        id: ActionId,
        bound: Option<f64>,
    ) -> Result<(), ActionError> {
        let var = self.action(id)?.variable;
        sys.update_variable_bound(var, bound)?;
        self.action_mut(id)?.bound = bound;
        Ok(())
    }

    /// Change the time left before a forced completion.
    pub fn set_max_duration(&mut self, id: ActionId, duration: Option<f64>) -> Result<(), ActionError> {
        let duration = check_duration(duration)?;
        self.action_mut(id)?.max_duration = duration;
        Ok(())
    }

    /// Attach an opaque consumer value.
    pub fn set_tag(&mut self, id: ActionId, tag: u64) -> Result<(), ActionError> {
        self.action_mut(id)?.tag = tag;
        Ok(())
    }

    /// Work left at `now`, refreshing against the elapsed clock first.
    pub fn get_remains(
        &mut self,
        sys: &MaxMinSystem,
        id: ActionId,
        now: f64,
    ) -> Result<f64, ActionError> {
        let action = self.action_mut(id)?;
        if action.state == ActionState::Running && now > action.last_update {
            if !action.suspended {
                let value = sys.solved_value(action.variable)?;
                double_update(&mut action.remains, value * (now - action.last_update));
            }
            action.last_update = now;
        }
        Ok(action.remains)
    }

    // ── Driver support ──────────────────────────────────────────

    /// Time until the first running action of `model` could complete, from
    /// its solved rate or its remaining max duration.
    pub fn min_completion(
        &self,
        sys: &mut MaxMinSystem,
        model: ModelId,
    ) -> Result<Option<f64>, ActionError> {
        let mut min: Option<f64> = None;
        let mut offer = |t: f64| {
            min = Some(min.map_or(t, |m: f64| m.min(t)));
        };
        for id in self.actions_in(model, ActionState::Running) {
            let Some(action) = self.actions.get(id) else {
                continue;
            };
            let value = sys.value(action.variable)?;
            if action.remains <= 0.0 && action.effective_weight() > 0.0 {
                offer(0.0);
            } else if value > 0.0 {
                offer(action.remains / value);
            }
            if let Some(d) = action.max_duration {
                offer(d);
            }
        }
        Ok(min)
    }

    /// Charge `delta` seconds of progress to every running action of
    /// `model` at its last solved rate, then apply the terminal transitions
    /// in priority order: resource failure, then work exhausted, then max
    /// duration elapsed.
    pub fn update_running(
        &mut self,
        sys: &mut MaxMinSystem,
        model: ModelId,
        now: f64,
        delta: f64,
    ) -> Result<Vec<Transition>, ActionError> {
        let running: Vec<ActionId> = self.actions_in(model, ActionState::Running).collect();
        let mut transitions = Vec::new();
        for id in running {
            let action = self.action_mut(id)?;
            let var = action.variable;
            if !action.suspended {
                let elapsed = delta.min(now - action.last_update).max(0.0);
                let value = sys.solved_value(var)?;
                double_update(&mut action.remains, value * elapsed);
            }
            if let Some(d) = action.max_duration.as_mut() {
                double_update(d, delta);
            }
            action.last_update = now;
            let (remains, expired) = (action.remains, action.max_duration == Some(0.0));

            let to = if !resources_up(sys, var)? {
                Some(ActionState::Failed)
            } else if remains <= 0.0 && sys.variable_weight(var)? > 0.0 {
                Some(ActionState::Done)
            } else if expired {
                Some(ActionState::Done)
            } else {
                None
            };
            if let Some(to) = to {
                self.finish(sys, id, to, now)?;
                transitions.push(Transition {
                    action: id,
                    to,
                    at: now,
                });
            }
        }
        Ok(transitions)
    }

    /// Destroy every action of `model` regardless of references.
    pub fn clear_model(&mut self, sys: &mut MaxMinSystem, model: ModelId) -> Result<(), ActionError> {
        let Some(sets) = self.sets.shift_remove(&model) else {
            return Ok(());
        };
        for state in [
            ActionState::Ready,
            ActionState::Running,
            ActionState::Failed,
            ActionState::Done,
        ] {
            for &id in sets.set(state).into_iter().flatten() {
                if let Some(action) = self.actions.remove(id) {
                    sys.free_variable(action.variable)?;
                }
            }
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────

    fn action(&self, id: ActionId) -> Result<&Action, ActionError> {
        self.actions.get(id).ok_or(ActionError::UnknownAction(id))
    }

    fn action_mut(&mut self, id: ActionId) -> Result<&mut Action, ActionError> {
        self.actions.get_mut(id).ok_or(ActionError::UnknownAction(id))
    }

    fn running_mut(&mut self, id: ActionId, operation: &'static str) -> Result<&mut Action, ActionError> {
        let action = self.action_mut(id)?;
        if action.state != ActionState::Running {
            return Err(ActionError::InvalidTransition {
                action: id,
                from: action.state,
                operation,
            });
        }
        Ok(action)
    }

    fn relocate(&mut self, id: ActionId, to: ActionState) -> Result<(), ActionError> {
        let action = self.action_mut(id)?;
        let (model, from) = (action.model, action.state);
        action.state = to;
        self.sets.entry(model).or_default().relocate(id, from, to);
        Ok(())
    }
}
