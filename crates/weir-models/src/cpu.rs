//! Hosts that execute computations.
//!
//! Every host is one shared constraint whose bound is its peak power times
//! the current power scale. A computation is an action consuming one unit
//! of host power per flop per second. A sleep is an action held at weight
//! 0 that completes when its maximum duration runs out.

use tracing::debug;
use weir_action::ActionSpec;
use weir_core::{ActionId, ConstraintId, ResourceId, Signal, StreamId, TraceEvent};
use weir_engine::{ModelContext, ModelError, ResourceModel};
use weir_lmm::SharingPolicy;
use weir_trace::Trace;

/// One host.
#[derive(Clone, Debug)]
pub struct Host {
    name: String,
    constraint: ConstraintId,
    power_peak: f64,
    power_scale: f64,
    on: bool,
}

impl Host {
    /// Host name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constraint backing the host.
    pub fn constraint(&self) -> ConstraintId {
        self.constraint
    }

    /// Nominal power in flop/s.
    pub fn power_peak(&self) -> f64 {
        self.power_peak
    }

    /// Current fraction of the peak available.
    pub fn power_scale(&self) -> f64 {
        self.power_scale
    }

    /// Available power right now.
    pub fn power(&self) -> f64 {
        self.power_peak * self.power_scale
    }

    /// Whether the host is up.
    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// The CPU model.
#[derive(Clone, Debug, Default)]
pub struct CpuModel {
    hosts: Vec<Host>,
}

impl CpuModel {
    /// A model with no hosts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a host of `power_peak` flop/s.
    pub fn add_host(
        &mut self,
        ctx: &mut ModelContext<'_>,
        name: impl Into<String>,
        power_peak: f64,
    ) -> Result<ResourceId, ModelError> {
        let constraint = ctx
            .system_mut()
            .new_constraint(power_peak, SharingPolicy::Shared)?;
        let id = ResourceId(self.hosts.len() as u32);
        let name = name.into();
        debug!(host = %name, resource = %id, power_peak, "host added");
        self.hosts.push(Host {
            name,
            constraint,
            power_peak,
            power_scale: 1.0,
            on: true,
        });
        Ok(id)
    }

    /// The host behind `id`.
    pub fn host(&self, id: ResourceId) -> Result<&Host, ModelError> {
        self.hosts
            .get(id.0 as usize)
            .ok_or(ModelError::UnknownResource(id))
    }

    /// Look a host up by name.
    pub fn host_by_name(&self, name: &str) -> Option<ResourceId> {
        self.hosts
            .iter()
            .position(|h| h.name == name)
            .map(|i| ResourceId(i as u32))
    }

    /// Number of hosts.
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Start computing `flops` on `host`.
    pub fn execute(
        &mut self,
        ctx: &mut ModelContext<'_>,
        host: ResourceId,
        flops: f64,
    ) -> Result<ActionId, ModelError> {
        let cnst = self.host(host)?.constraint;
        let id = ctx.create_action(ActionSpec::new(flops).consume(cnst, 1.0))?;
        ctx.start_action(id)?;
        Ok(id)
    }

    /// Sleep on `host` for `duration` seconds, or forever with `None`.
    ///
    /// The sleep fails like any other action if the host goes down.
    pub fn sleep(
        &mut self,
        ctx: &mut ModelContext<'_>,
        host: ResourceId,
        duration: Option<f64>,
    ) -> Result<ActionId, ModelError> {
        let cnst = self.host(host)?.constraint;
        let mut spec = ActionSpec::new(0.0).consume(cnst, 1.0);
        spec.max_duration = duration;
        let id = ctx.create_action(spec)?;
        ctx.set_gated(id, true)?;
        ctx.start_action(id)?;
        Ok(id)
    }

    /// Drive the power scale of `host` from a trace.
    pub fn power_trace(
        &mut self,
        ctx: &mut ModelContext<'_>,
        host: ResourceId,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        self.host(host)?;
        ctx.add_trace(host, Signal::Capacity, trace, start_date, loop_count)
    }

    /// Drive the on/off state of `host` from a trace.
    pub fn state_trace(
        &mut self,
        ctx: &mut ModelContext<'_>,
        host: ResourceId,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        self.host(host)?;
        ctx.add_trace(host, Signal::State, trace, start_date, loop_count)
    }

    fn host_mut(&mut self, id: ResourceId) -> Result<&mut Host, ModelError> {
        self.hosts
            .get_mut(id.0 as usize)
            .ok_or(ModelError::UnknownResource(id))
    }
}

impl ResourceModel for CpuModel {
    fn name(&self) -> &str {
        "cpu"
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
        let host = self.host_mut(resource)?;
        match event.resource.signal {
            Signal::Capacity => {
                host.power_scale = event.value;
                let (cnst, power) = (host.constraint, host.power());
                ctx.system_mut().update_constraint_bound(cnst, power)?;
            }
            Signal::State => {
                host.on = event.value > 0.0;
                let (cnst, on) = (host.constraint, host.on);
                ctx.system_mut().set_constraint_active(cnst, on)?;
                debug!(host = %host.name, on, "host state changed");
            }
            signal => return Err(ModelError::UnsupportedSignal { resource, signal }),
        }
        Ok(())
    }

    fn resource_used(&self, ctx: &ModelContext<'_>, resource: ResourceId) -> Result<bool, ModelError> {
        let cnst = self.host(resource)?.constraint;
        Ok(ctx.system().constraint_used(cnst)? || ctx.constraint_in_use(cnst)?)
    }
}
