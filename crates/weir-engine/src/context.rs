//! Execution context handed to resource models.
//!
//! [`ModelContext`] split-borrows the kernel: a model gets mutable access
//! to the network, the action table and the history while the kernel keeps
//! the model itself borrowed separately. The helpers cover what every
//! model does the same way, so that the failure-before-completion ordering
//! and the pre-event rate rule live in one place.

use crate::error::ModelError;
use weir_action::{ActionSpec, ActionState, ActionTable, Transition};
use weir_core::{ActionId, ConstraintId, ModelId, ResourceHandle, ResourceId, Signal, StreamId};
use weir_lmm::MaxMinSystem;
use weir_trace::{History, Trace, TraceError};

/// What a [`ResourceModel`](crate::ResourceModel) sees during one call.
pub struct ModelContext<'a> {
    model: ModelId,
    now: f64,
    system: &'a mut MaxMinSystem,
    actions: &'a mut ActionTable,
    history: &'a mut History,
    transitions: &'a mut Vec<Transition>,
}

impl<'a> ModelContext<'a> {
    /// Construct a context.
    ///
    /// Called by the kernel. Tests can build one over their own parts.
    pub fn new(
        model: ModelId,
        now: f64,
        system: &'a mut MaxMinSystem,
        actions: &'a mut ActionTable,
        history: &'a mut History,
        transitions: &'a mut Vec<Transition>,
    ) -> Self {
        Self {
            model,
            now,
            system,
            actions,
            history,
            transitions,
        }
    }

    /// The model being called.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Simulated clock.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// The shared constraint/variable network.
    pub fn system(&self) -> &MaxMinSystem {
        &*self.system
    }

    /// Mutable access to the network.
    pub fn system_mut(&mut self) -> &mut MaxMinSystem {
        &mut *self.system
    }

    /// Every live action.
    pub fn actions(&self) -> &ActionTable {
        &*self.actions
    }

    /// Terminal transitions applied so far in the current step.
    pub fn transitions(&self) -> &[Transition] {
        self.transitions.as_slice()
    }

    /// Whether a resource backed by `cnst` matters to this model's work.
    ///
    /// True when a running action of this model is attached to it, even at
    /// weight 0, so that suspended and sleeping actions see it go down.
    pub fn constraint_in_use(&self, cnst: ConstraintId) -> Result<bool, ModelError> {
        Ok(self.actions.running_on(&*self.system, self.model, cnst)?)
    }

    // ── Actions ─────────────────────────────────────────────────

    /// Create a `Ready` action owned by this model.
    pub fn create_action(&mut self, spec: ActionSpec) -> Result<ActionId, ModelError> {
        Ok(self.actions.create(self.system, self.model, spec)?)
    }

    /// Start an action at the current clock.
    pub fn start_action(&mut self, id: ActionId) -> Result<ActionState, ModelError> {
        let state = self.actions.start(self.system, id, self.now)?;
        if state == ActionState::Failed {
            self.transitions.push(Transition {
                action: id,
                to: state,
                at: self.now,
            });
        }
        Ok(state)
    }

    /// Hold an action at weight 0 on behalf of the model, or release it.
    pub fn set_gated(&mut self, id: ActionId, gated: bool) -> Result<(), ModelError> {
        Ok(self.actions.set_gated(self.system, id, gated)?)
    }

    /// Force an action into a terminal state at the current clock.
    pub fn finish_action(&mut self, id: ActionId, to: ActionState) -> Result<(), ModelError> {
        self.actions.finish(self.system, id, to, self.now)?;
        self.transitions.push(Transition {
            action: id,
            to,
            at: self.now,
        });
        Ok(())
    }

    /// Earliest completion among this model's running actions.
    ///
    /// This is the whole of `share_resources` for a model whose actions are
    /// plain solver variables.
    pub fn share_running(&mut self) -> Result<Option<f64>, ModelError> {
        Ok(self.actions.min_completion(self.system, self.model)?)
    }

    /// Charge `delta` of progress to this model's running actions at their
    /// last solved rates and apply the resulting terminal transitions.
    pub fn update_running(&mut self, delta: f64) -> Result<(), ModelError> {
        let moved = self
            .actions
            .update_running(self.system, self.model, self.now, delta)?;
        self.transitions.extend(moved);
        Ok(())
    }

    // ── Traces ──────────────────────────────────────────────────

    /// Attach a trace to one of this model's resources.
    pub fn add_trace(
        &mut self,
        resource: ResourceId,
        signal: Signal,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        if start_date < self.now {
            return Err(TraceError::InvalidStartDate { start: start_date }.into());
        }
        let handle = ResourceHandle::new(self.model, resource, signal);
        Ok(self.history.add_trace(handle, trace, start_date, loop_count)?)
    }

    /// Detach a trace stream.
    pub fn remove_trace(&mut self, stream: StreamId) -> bool {
        self.history.remove_stream(stream)
    }
}
