//! The discrete-event driver.
//!
//! [`Kernel::solve`] performs one step:
//!
//! 1. On the very first call, apply the trace events due at the initial
//!    clock and let every model settle with a zero-length update.
//! 2. Ask every model for the time to its next completion; keep the
//!    minimum.
//! 3. Apply the trace events that fall inside that horizon, in date order.
//!    An event on a resource that running actions use cuts the horizon
//!    down to its own date, so rates change exactly then.
//! 4. Advance the clock to the horizon and have every model charge the
//!    elapsed time to its running actions.
//!
//! With no completion pending, the next trace event (if any, and within
//! `max_date`) becomes the horizon. With neither, `solve` reports that
//! nothing more can happen.

use crate::config::KernelConfig;
use crate::context::ModelContext;
use crate::error::{KernelError, ModelError};
use crate::metrics::SolveMetrics;
use crate::model::ResourceModel;
use std::time::Instant;
use tracing::{debug, trace, warn};
use weir_action::{Action, ActionSpec, ActionState, ActionTable, Transition};
use weir_core::{ActionId, ModelId, ResourceHandle, StreamId, TraceEvent};
use weir_lmm::MaxMinSystem;
use weir_trace::{History, Trace, TraceError};

/// Owns the network, the actions, the history, the models and the clock.
pub struct Kernel {
    config: KernelConfig,
    system: MaxMinSystem,
    actions: ActionTable,
    history: History,
    models: Vec<Box<dyn ResourceModel>>,
    transitions: Vec<Transition>,
    clock: f64,
    started: bool,
    zero_steps: u32,
    steps: u64,
    metrics: SolveMetrics,
}

fn model_error(model: &dyn ResourceModel, source: ModelError) -> KernelError {
    KernelError::Model {
        model: model.name().to_string(),
        source,
    }
}

impl Kernel {
    /// Build an empty kernel at clock 0.
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        config.validate()?;
        Ok(Self {
            system: MaxMinSystem::new(config.solver()),
            config,
            actions: ActionTable::new(),
            history: History::new(),
            models: Vec::new(),
            transitions: Vec::new(),
            clock: 0.0,
            started: false,
            zero_steps: 0,
            steps: 0,
            metrics: SolveMetrics::default(),
        })
    }

    /// The configuration the kernel was built with.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Simulated clock.
    pub fn current_clock(&self) -> f64 {
        self.clock
    }

    /// Number of completed [`solve`](Self::solve) calls.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Metrics of the most recent step.
    pub fn last_metrics(&self) -> &SolveMetrics {
        &self.metrics
    }

    /// Terminal transitions applied during the most recent step, plus any
    /// failure on start recorded since. Cleared when the next step begins.
    pub fn last_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The constraint/variable network.
    pub fn system(&self) -> &MaxMinSystem {
        &self.system
    }

    /// Mutable access to the network, for wiring that no model owns.
    pub fn system_mut(&mut self) -> &mut MaxMinSystem {
        &mut self.system
    }

    /// Every live action.
    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// The future event set.
    pub fn history(&self) -> &History {
        &self.history
    }

    // ── Models ──────────────────────────────────────────────────

    /// Register a model. Models are driven in registration order.
    pub fn add_model<M: ResourceModel>(&mut self, model: M) -> ModelId {
        let id = ModelId(self.models.len() as u32);
        debug!(model = %id, name = model.name(), "model registered");
        self.models.push(Box::new(model));
        id
    }

    /// Number of registered models.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Name of a registered model.
    pub fn model_name(&self, id: ModelId) -> Result<&str, KernelError> {
        self.models
            .get(id.0 as usize)
            .map(|m| m.name())
            .ok_or(KernelError::UnknownModel(id))
    }

    /// Typed read access to a registered model.
    pub fn model<M: ResourceModel>(&self, id: ModelId) -> Result<&M, KernelError> {
        let model = self
            .models
            .get(id.0 as usize)
            .ok_or(KernelError::UnknownModel(id))?;
        model
            .downcast_ref::<M>()
            .ok_or(KernelError::ModelTypeMismatch {
                model: id,
                expected: std::any::type_name::<M>(),
            })
    }

    /// Run `f` against a registered model and a context over the kernel's
    /// state. This is how consumers reach model-specific operations
    /// (adding hosts, executing, communicating).
    pub fn with_model<M, R>(
        &mut self,
        id: ModelId,
        f: impl FnOnce(&mut M, &mut ModelContext<'_>) -> Result<R, ModelError>,
    ) -> Result<R, KernelError>
    where
        M: ResourceModel,
    {
        let (model, mut ctx) = self.split(id)?;
        let name = model.name().to_string();
        let typed = model
            .downcast_mut::<M>()
            .ok_or(KernelError::ModelTypeMismatch {
                model: id,
                expected: std::any::type_name::<M>(),
            })?;
        f(typed, &mut ctx).map_err(|source| KernelError::Model {
            model: name,
            source,
        })
    }

    fn split(
        &mut self,
        id: ModelId,
    ) -> Result<(&mut (dyn ResourceModel + 'static), ModelContext<'_>), KernelError> {
        let Kernel {
            models,
            system,
            actions,
            history,
            transitions,
            clock,
            ..
        } = self;
        let model = models
            .get_mut(id.0 as usize)
            .ok_or(KernelError::UnknownModel(id))?;
        let ctx = ModelContext::new(id, *clock, system, actions, history, transitions);
        Ok((model.as_mut(), ctx))
    }

    // ── Traces ──────────────────────────────────────────────────

    /// Attach a trace to a model resource, starting at `start_date`.
    pub fn add_trace(
        &mut self,
        resource: ResourceHandle,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, KernelError> {
        if resource.model.0 as usize >= self.models.len() {
            return Err(KernelError::UnknownModel(resource.model));
        }
        if start_date < self.clock {
            return Err(TraceError::InvalidStartDate { start: start_date }.into());
        }
        Ok(self.history.add_trace(resource, trace, start_date, loop_count)?)
    }

    /// Detach a trace stream. Returns whether it was still live.
    pub fn remove_trace(&mut self, stream: StreamId) -> bool {
        let live = self.history.remove_stream(stream);
        if !live {
            warn!(%stream, "remove_trace on a stream that is not live");
        }
        live
    }

    // ── Actions ─────────────────────────────────────────────────

    /// Create a `Ready` action owned by `model`, outside any model hook.
    pub fn create_action(&mut self, model: ModelId, spec: ActionSpec) -> Result<ActionId, KernelError> {
        if model.0 as usize >= self.models.len() {
            return Err(KernelError::UnknownModel(model));
        }
        Ok(self.actions.create(&mut self.system, model, spec)?)
    }

    /// The action behind `id`, if live.
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    /// State of `id`; stale handles are [`ActionState::NotInSystem`].
    pub fn action_state(&self, id: ActionId) -> ActionState {
        self.actions.state(id)
    }

    /// Actions of `model` in `state`, in the order they entered it.
    pub fn actions_in(&self, model: ModelId, state: ActionState) -> impl Iterator<Item = ActionId> + '_ {
        self.actions.actions_in(model, state)
    }

    /// `Ready → Running` at the current clock.
    ///
    /// An action that fails on a downed resource is recorded in
    /// [`last_transitions`](Self::last_transitions).
    pub fn start(&mut self, id: ActionId) -> Result<ActionState, KernelError> {
        let state = self.actions.start(&mut self.system, id, self.clock)?;
        if state == ActionState::Failed {
            self.transitions.push(Transition {
                action: id,
                to: state,
                at: self.clock,
            });
        }
        Ok(state)
    }

    /// Freeze a running action.
    pub fn suspend(&mut self, id: ActionId) -> Result<(), KernelError> {
        Ok(self.actions.suspend(&mut self.system, id)?)
    }

    /// Unfreeze a running action.
    pub fn resume(&mut self, id: ActionId) -> Result<(), KernelError> {
        Ok(self.actions.resume(&mut self.system, id)?)
    }

    /// Force an action into `Failed` at the current clock.
    pub fn cancel(&mut self, id: ActionId) -> Result<(), KernelError> {
        Ok(self.actions.cancel(&mut self.system, id, self.clock)?)
    }

    /// Change an action's fairness weight.
    pub fn set_priority(&mut self, id: ActionId, priority: f64) -> Result<(), KernelError> {
        Ok(self.actions.set_priority(&mut self.system, id, priority)?)
    }

    /// Change an action's rate cap.
    pub fn set_bound(&mut self, id: ActionId, bound: Option<f64>) -> Result<(), KernelError> {
        Ok(self.actions.set_bound(&mut self.system, id, bound)?)
    }

    /// Change the simulated time left before a forced completion.
    pub fn set_max_duration(&mut self, id: ActionId, duration: Option<f64>) -> Result<(), KernelError> {
        Ok(self.actions.set_max_duration(id, duration)?)
    }

    /// Attach an opaque consumer value to an action.
    pub fn set_tag(&mut self, id: ActionId, tag: u64) -> Result<(), KernelError> {
        Ok(self.actions.set_tag(id, tag)?)
    }

    /// Work left at the current clock.
    pub fn get_remains(&mut self, id: ActionId) -> Result<f64, KernelError> {
        Ok(self.actions.get_remains(&self.system, id, self.clock)?)
    }

    /// Take one more reference to an action.
    pub fn ref_action(&mut self, id: ActionId) -> Result<(), KernelError> {
        Ok(self.actions.ref_action(id)?)
    }

    /// Release one reference; `ToFree` means the action is gone.
    pub fn unref(&mut self, id: ActionId) -> Result<ActionState, KernelError> {
        Ok(self.actions.unref(&mut self.system, id)?)
    }

    // ── Driving ─────────────────────────────────────────────────

    /// One discrete-event step.
    ///
    /// Returns the simulated time the clock advanced by, or `None` when
    /// no action can complete and no trace event is due (before
    /// `max_date`, if given). A `max_date` earlier than the next event
    /// clamps the step to it.
    pub fn solve(&mut self, max_date: Option<f64>) -> Result<Option<f64>, KernelError> {
        let started_at = Instant::now();
        self.transitions.clear();

        if !self.started {
            self.started = true;
            let mut events = 0;
            for event in self.history.pop_events_leq(self.clock) {
                self.apply_event(&event)?;
                events += 1;
            }
            self.update_models(0.0)?;
            self.record_step(started_at, 0.0, events);
            return Ok(Some(0.0));
        }

        let mut horizon = self.share_resources()?.map(|min| self.clock + min);
        if let (Some(h), Some(max)) = (horizon, max_date) {
            if h > max {
                horizon = Some(max.max(self.clock));
            }
        }

        let mut events = 0;
        while let Some(next) = self.history.next_date() {
            let due = match horizon {
                Some(h) => next <= h,
                None => max_date.is_none_or(|max| next <= max),
            };
            if !due {
                break;
            }
            for event in self.history.pop_events_leq(next) {
                let used = self.apply_event(&event)?;
                events += 1;
                if used || horizon.is_none() {
                    horizon = Some(horizon.map_or(event.date, |h| h.min(event.date)));
                }
            }
        }

        let Some(target) = horizon else {
            self.record_step(started_at, 0.0, events);
            debug!(clock = self.clock, "no pending action or event");
            return Ok(None);
        };

        let delta = (target - self.clock).max(0.0);
        self.clock = self.clock.max(target);
        self.update_models(delta)?;

        if delta > 0.0 {
            self.zero_steps = 0;
        } else {
            self.zero_steps += 1;
            if self.zero_steps > self.config.max_zero_steps {
                return Err(KernelError::Stalled {
                    clock: self.clock,
                    steps: self.zero_steps,
                });
            }
        }
        self.record_step(started_at, delta, events);
        Ok(Some(delta))
    }

    /// Step until the clock reaches `date` or nothing more can happen.
    ///
    /// If the simulation runs dry before `date`, the clock jumps to it.
    pub fn run_until(&mut self, date: f64) -> Result<(), KernelError> {
        let mut budget = self.config.max_steps_per_run;
        while !self.started || self.clock < date {
            if budget == 0 {
                return Err(KernelError::StepLimit {
                    steps: self.config.max_steps_per_run,
                });
            }
            budget -= 1;
            if self.solve(Some(date))?.is_none() {
                self.clock = self.clock.max(date);
                break;
            }
        }
        Ok(())
    }

    /// Step until `id` is `Done`, `Failed` or gone, or nothing more can
    /// happen. Returns the state it ended in.
    pub fn run_until_terminal(&mut self, id: ActionId) -> Result<ActionState, KernelError> {
        let mut budget = self.config.max_steps_per_run;
        loop {
            let state = self.actions.state(id);
            if state.is_terminal() || state == ActionState::NotInSystem {
                return Ok(state);
            }
            if budget == 0 {
                return Err(KernelError::StepLimit {
                    steps: self.config.max_steps_per_run,
                });
            }
            budget -= 1;
            if self.solve(None)?.is_none() {
                return Ok(self.actions.state(id));
            }
        }
    }

    /// Let every model release its state, then drop every action.
    pub fn finalize(&mut self) -> Result<(), KernelError> {
        for index in 0..self.models.len() {
            let id = ModelId(index as u32);
            let (model, mut ctx) = self.split(id)?;
            model.finalize(&mut ctx).map_err(|e| model_error(model, e))?;
            self.actions.clear_model(&mut self.system, id)?;
        }
        debug!(clock = self.clock, steps = self.steps, "kernel finalized");
        Ok(())
    }

    // ── Step internals ──────────────────────────────────────────

    fn share_resources(&mut self) -> Result<Option<f64>, KernelError> {
        let mut min: Option<f64> = None;
        for index in 0..self.models.len() {
            let (model, mut ctx) = self.split(ModelId(index as u32))?;
            let offer = model
                .share_resources(&mut ctx)
                .map_err(|e| model_error(model, e))?;
            if let Some(t) = offer.filter(|t| t.is_finite() && *t >= 0.0) {
                min = Some(min.map_or(t, |m| m.min(t)));
            }
        }
        Ok(min)
    }

    /// Apply one event; returns whether its resource was in use.
    fn apply_event(&mut self, event: &TraceEvent) -> Result<bool, KernelError> {
        let (model, mut ctx) = self.split(event.resource.model)?;
        let used = model
            .resource_used(&ctx, event.resource.resource)
            .map_err(|e| model_error(model, e))?;
        model
            .update_resource_state(&mut ctx, event)
            .map_err(|e| model_error(model, e))?;
        trace!(resource = %event.resource, date = event.date, value = event.value, used, "trace event applied");
        Ok(used)
    }

    fn update_models(&mut self, delta: f64) -> Result<(), KernelError> {
        for index in 0..self.models.len() {
            let (model, mut ctx) = self.split(ModelId(index as u32))?;
            model
                .update_actions_state(&mut ctx, delta)
                .map_err(|e| model_error(model, e))?;
        }
        Ok(())
    }

    fn record_step(&mut self, started_at: Instant, elapsed: f64, events: u32) {
        let count = |to: ActionState| self.transitions.iter().filter(|t| t.to == to).count() as u32;
        self.metrics = SolveMetrics {
            step_us: started_at.elapsed().as_micros() as u64,
            elapsed,
            clock: self.clock,
            events_applied: events,
            actions_done: count(ActionState::Done),
            actions_failed: count(ActionState::Failed),
            solver: self.system.last_stats().clone(),
        };
        self.steps += 1;
        debug!(
            clock = self.clock,
            elapsed,
            events,
            done = self.metrics.actions_done,
            failed = self.metrics.actions_failed,
            "step"
        );
    }
}
