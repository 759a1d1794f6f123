//! Reusable resource-model fixtures.
//!
//! - [`SharedModel`]: actions are plain solver variables on model-owned
//!   constraints; capacity and state traces are applied as-is.
//! - [`RecordingModel`]: records every hook call the driver makes.
//! - [`UnimplementedModel`]: refuses one hook.

use weir_action::ActionSpec;
use weir_core::{ActionId, ConstraintId, ResourceId, Signal, TraceEvent};
use weir_engine::{ModelContext, ModelError, ResourceModel};
use weir_lmm::SharingPolicy;

// ── SharedModel ─────────────────────────────────────────────────

/// A model of independent capacities.
///
/// A `Capacity` event sets the constraint bound to the event value; a
/// `State` event turns the constraint on (> 0) or off.
pub struct SharedModel {
    pub name: String,
    resources: Vec<ConstraintId>,
}

impl SharedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
        }
    }

    pub fn add_resource(
        &mut self,
        ctx: &mut ModelContext<'_>,
        capacity: f64,
        policy: SharingPolicy,
    ) -> Result<ResourceId, ModelError> {
        let cnst = ctx.system_mut().new_constraint(capacity, policy)?;
        self.resources.push(cnst);
        Ok(ResourceId(self.resources.len() as u32 - 1))
    }

    pub fn constraint(&self, resource: ResourceId) -> Result<ConstraintId, ModelError> {
        self.resources
            .get(resource.0 as usize)
            .copied()
            .ok_or(ModelError::UnknownResource(resource))
    }

    /// Create and start an action of `cost` on one resource.
    pub fn submit(
        &mut self,
        ctx: &mut ModelContext<'_>,
        resource: ResourceId,
        cost: f64,
    ) -> Result<ActionId, ModelError> {
        let cnst = self.constraint(resource)?;
        self.submit_spec(ctx, ActionSpec::new(cost).consume(cnst, 1.0))
    }

    /// Create and start an action from a full spec.
    pub fn submit_spec(
        &mut self,
        ctx: &mut ModelContext<'_>,
        spec: ActionSpec,
    ) -> Result<ActionId, ModelError> {
        let id = ctx.create_action(spec)?;
        ctx.start_action(id)?;
        Ok(id)
    }
}

impl ResourceModel for SharedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
        ctx.share_running()
    }

    fn update_actions_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        delta: f64,
    ) -> Result<(), ModelError> {
        ctx.update_running(delta)
    }

    fn update_resource_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        event: &TraceEvent,
    ) -> Result<(), ModelError> {
        let resource = event.resource.resource;
        let cnst = self.constraint(resource)?;
        match event.resource.signal {
            Signal::Capacity => ctx.system_mut().update_constraint_bound(cnst, event.value)?,
            Signal::State => ctx.system_mut().set_constraint_active(cnst, event.value > 0.0)?,
            signal => return Err(ModelError::UnsupportedSignal { resource, signal }),
        }
        Ok(())
    }

    fn resource_used(
        &self,
        ctx: &ModelContext<'_>,
        resource: ResourceId,
    ) -> Result<bool, ModelError> {
        let cnst = self.constraint(resource)?;
        Ok(ctx.system().constraint_used(cnst)? || ctx.constraint_in_use(cnst)?)
    }
}

// ── RecordingModel ──────────────────────────────────────────────

/// One hook invocation seen by a [`RecordingModel`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Share { now: f64 },
    Update { now: f64, delta: f64 },
    Used { now: f64, resource: ResourceId },
    Event { now: f64, event: TraceEvent },
    Finalize,
}

/// Owns no actions; reports `offer` from every `share_resources` call and
/// `used` from every `resource_used` call.
#[derive(Default)]
pub struct RecordingModel {
    pub calls: Vec<Call>,
    pub offer: Option<f64>,
    pub used: bool,
}

impl RecordingModel {
    pub fn new(offer: Option<f64>, used: bool) -> Self {
        Self {
            calls: Vec::new(),
            offer,
            used,
        }
    }

    /// Just the events, in the order they were applied.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Event { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    /// Just the update deltas.
    pub fn deltas(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Update { delta, .. } => Some(*delta),
                _ => None,
            })
            .collect()
    }
}

impl ResourceModel for RecordingModel {
    fn name(&self) -> &str {
        "recording"
    }

    fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
        self.calls.push(Call::Share { now: ctx.now() });
        Ok(self.offer)
    }

    fn update_actions_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        delta: f64,
    ) -> Result<(), ModelError> {
        self.calls.push(Call::Update {
            now: ctx.now(),
            delta,
        });
        Ok(())
    }

    fn update_resource_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        event: &TraceEvent,
    ) -> Result<(), ModelError> {
        self.calls.push(Call::Event {
            now: ctx.now(),
            event: *event,
        });
        Ok(())
    }

    fn resource_used(
        &self,
        _ctx: &ModelContext<'_>,
        _resource: ResourceId,
    ) -> Result<bool, ModelError> {
        Ok(self.used)
    }

    fn finalize(&mut self, _ctx: &mut ModelContext<'_>) -> Result<(), ModelError> {
        self.calls.push(Call::Finalize);
        Ok(())
    }
}

// ── UnimplementedModel ──────────────────────────────────────────

/// Refuses `share_resources` or `update_actions_state`, whichever is
/// named; the trace hooks keep their unimplemented defaults.
pub struct UnimplementedModel {
    pub refuse: &'static str,
}

impl UnimplementedModel {
    pub fn refusing(operation: &'static str) -> Self {
        Self { refuse: operation }
    }
}

impl ResourceModel for UnimplementedModel {
    fn name(&self) -> &str {
        "unimplemented"
    }

    fn share_resources(&mut self, _ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
        if self.refuse == "share_resources" {
            return Err(self.unimplemented("share_resources"));
        }
        Ok(None)
    }

    fn update_actions_state(
        &mut self,
        _ctx: &mut ModelContext<'_>,
        _delta: f64,
    ) -> Result<(), ModelError> {
        if self.refuse == "update_actions_state" {
            return Err(self.unimplemented("update_actions_state"));
        }
        Ok(())
    }
}
