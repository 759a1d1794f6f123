//! Links with bandwidth and latency, shared by transfers.
//!
//! A transfer over a route first waits out the summed latency of its links,
//! held at weight 0, then competes for bandwidth on every link of the
//! route at once. `Shared` links split their bandwidth between transfers;
//! `Fatpipe` links give each transfer the full bandwidth.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace};
use weir_action::{ActionSpec, ActionState};
use weir_core::numeric::double_update;
use weir_core::{ActionId, ConstraintId, ResourceId, Signal, StreamId, TraceEvent};
use weir_engine::{ModelContext, ModelError, ResourceModel};
use weir_lmm::SharingPolicy;
use weir_trace::Trace;

/// One link.
#[derive(Clone, Debug)]
pub struct Link {
    name: String,
    constraint: ConstraintId,
    bandwidth_peak: f64,
    bandwidth_scale: f64,
    latency: f64,
    policy: SharingPolicy,
    on: bool,
}

impl Link {
    /// Link name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constraint backing the link.
    pub fn constraint(&self) -> ConstraintId {
        self.constraint
    }

    /// Available bandwidth right now.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth_peak * self.bandwidth_scale
    }

    /// Current latency in seconds.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// How the bandwidth is shared.
    pub fn policy(&self) -> SharingPolicy {
        self.policy
    }

    /// Whether the link is up.
    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// The network model.
#[derive(Clone, Debug, Default)]
pub struct NetworkModel {
    links: Vec<Link>,
    /// Transfers still in their latency phase, with the latency left.
    latency_left: IndexMap<ActionId, f64>,
}

impl NetworkModel {
    /// A model with no links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a link.
    pub fn add_link(
        &mut self,
        ctx: &mut ModelContext<'_>,
        name: impl Into<String>,
        bandwidth: f64,
        latency: f64,
        policy: SharingPolicy,
    ) -> Result<ResourceId, ModelError> {
        check_latency(latency)?;
        let constraint = ctx.system_mut().new_constraint(bandwidth, policy)?;
        let id = ResourceId(self.links.len() as u32);
        let name = name.into();
        debug!(link = %name, resource = %id, bandwidth, latency, "link added");
        self.links.push(Link {
            name,
            constraint,
            bandwidth_peak: bandwidth,
            bandwidth_scale: 1.0,
            latency,
            policy,
            on: true,
        });
        Ok(id)
    }

    /// The link behind `id`.
    pub fn link(&self, id: ResourceId) -> Result<&Link, ModelError> {
        self.links
            .get(id.0 as usize)
            .ok_or(ModelError::UnknownResource(id))
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Summed latency of a route.
    pub fn route_latency(&self, route: &[ResourceId]) -> Result<f64, ModelError> {
        route
            .iter()
            .try_fold(0.0, |sum, &id| Ok(sum + self.link(id)?.latency))
    }

    /// Latency left for a transfer still in its latency phase.
    pub fn latency_left(&self, id: ActionId) -> Option<f64> {
        self.latency_left.get(&id).copied()
    }

    /// Start sending `size` bytes over `route`, optionally capped at `rate`.
    ///
    /// A link listed twice is crossed twice and carries the transfer with
    /// coefficient 2.
    pub fn communicate(
        &mut self,
        ctx: &mut ModelContext<'_>,
        route: &[ResourceId],
        size: f64,
        rate: Option<f64>,
    ) -> Result<ActionId, ModelError> {
        if route.is_empty() {
            return Err(ModelError::InvalidArgument {
                reason: "a transfer needs at least one link".into(),
            });
        }
        let latency = self.route_latency(route)?;
        let consumes: SmallVec<[(ConstraintId, f64); 4]> = route
            .iter()
            .map(|&id| self.link(id).map(|l| (l.constraint, 1.0)))
            .collect::<Result<_, _>>()?;
        let mut spec = ActionSpec::new(size);
        spec.bound = rate;
        spec.consumes = consumes;

        let id = ctx.create_action(spec)?;
        if latency > 0.0 {
            ctx.set_gated(id, true)?;
        }
        if ctx.start_action(id)? == ActionState::Running && latency > 0.0 {
            self.latency_left.insert(id, latency);
        }
        trace!(action = %id, size, latency, hops = route.len(), "transfer started");
        Ok(id)
    }

    /// Drive the bandwidth scale of `link` from a trace.
    pub fn bandwidth_trace(
        &mut self,
        ctx: &mut ModelContext<'_>,
        link: ResourceId,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        self.link(link)?;
        ctx.add_trace(link, Signal::Capacity, trace, start_date, loop_count)
    }

    /// Drive the latency of `link` from a trace. Only transfers started
    /// after a change see it.
    pub fn latency_trace(
        &mut self,
        ctx: &mut ModelContext<'_>,
        link: ResourceId,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        self.link(link)?;
        ctx.add_trace(link, Signal::Latency, trace, start_date, loop_count)
    }

    /// Drive the on/off state of `link` from a trace.
    pub fn state_trace(
        &mut self,
        ctx: &mut ModelContext<'_>,
        link: ResourceId,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, ModelError> {
        self.link(link)?;
        ctx.add_trace(link, Signal::State, trace, start_date, loop_count)
    }

    fn link_mut(&mut self, id: ResourceId) -> Result<&mut Link, ModelError> {
        self.links
            .get_mut(id.0 as usize)
            .ok_or(ModelError::UnknownResource(id))
    }
}

fn check_latency(latency: f64) -> Result<(), ModelError> {
    if !latency.is_finite() || latency < 0.0 {
        return Err(ModelError::InvalidArgument {
            reason: format!("latency must be finite and non-negative, got {latency}"),
        });
    }
    Ok(())
}

impl ResourceModel for NetworkModel {
    fn name(&self) -> &str {
        "network"
    }

    fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
        let mut min = ctx.share_running()?;
        for (&id, &left) in &self.latency_left {
            if left > 0.0 && ctx.actions().state(id) == ActionState::Running {
                min = Some(min.map_or(left, |m| m.min(left)));
            }
        }
        Ok(min)
    }

    fn update_actions_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        delta: f64,
    ) -> Result<(), ModelError> {
        self.latency_left
            .retain(|&id, _| ctx.actions().state(id) == ActionState::Running);
        let mut arrived = Vec::new();
        for (&id, left) in self.latency_left.iter_mut() {
            double_update(left, delta);
            if *left <= 0.0 {
                arrived.push(id);
            }
        }
        for id in arrived {
            self.latency_left.shift_remove(&id);
            ctx.set_gated(id, false)?;
        }
        ctx.update_running(delta)
    }

    fn update_resource_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        event: &TraceEvent,
    ) -> Result<(), ModelError> {
        let resource = event.resource.resource;
        let link = self.link_mut(resource)?;
        match event.resource.signal {
            Signal::Capacity => {
                link.bandwidth_scale = event.value;
                let (cnst, bandwidth) = (link.constraint, link.bandwidth());
                ctx.system_mut().update_constraint_bound(cnst, bandwidth)?;
            }
            Signal::Latency => {
                check_latency(event.value)?;
                link.latency = event.value;
            }
            Signal::State => {
                link.on = event.value > 0.0;
                let (cnst, on) = (link.constraint, link.on);
                ctx.system_mut().set_constraint_active(cnst, on)?;
                debug!(link = %link.name, on, "link state changed");
            }
            signal => return Err(ModelError::UnsupportedSignal { resource, signal }),
        }
        Ok(())
    }

    /// A link is in use while it carries bandwidth or while a transfer
    /// crossing it is still in its latency phase.
    fn resource_used(&self, ctx: &ModelContext<'_>, resource: ResourceId) -> Result<bool, ModelError> {
        let cnst = self.link(resource)?.constraint;
        Ok(ctx.system().constraint_used(cnst)? || ctx.constraint_in_use(cnst)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_core::ModelId;
    use weir_engine::{Kernel, KernelConfig};

    fn kernel() -> (Kernel, ModelId) {
        let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
        let net = kernel.add_model(NetworkModel::new());
        (kernel, net)
    }

    fn link(kernel: &mut Kernel, net: ModelId, bw: f64, lat: f64, policy: SharingPolicy) -> ResourceId {
        kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| m.add_link(ctx, "l", bw, lat, policy))
            .unwrap()
    }

    fn send(kernel: &mut Kernel, net: ModelId, route: &[ResourceId], size: f64) -> ActionId {
        kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, route, size, None))
            .unwrap()
    }

    #[test]
    fn transfer_waits_out_latency_then_streams() {
        let (mut kernel, net) = kernel();
        let a = link(&mut kernel, net, 100.0, 0.5, SharingPolicy::Shared);
        let b = link(&mut kernel, net, 50.0, 1.5, SharingPolicy::Shared);
        let id = send(&mut kernel, net, &[a, b], 200.0);
        assert_eq!(
            kernel.model::<NetworkModel>(net).unwrap().latency_left(id),
            Some(2.0)
        );

        kernel.run_until(2.0).unwrap();
        assert_eq!(kernel.get_remains(id).unwrap(), 200.0);
        assert!(!kernel.action(id).unwrap().is_gated());

        assert_eq!(kernel.run_until_terminal(id).unwrap(), ActionState::Done);
        // The slower link is the bottleneck: 200 / 50.
        assert_eq!(kernel.current_clock(), 6.0);
    }

    #[test]
    fn shared_link_splits_and_fatpipe_does_not() {
        for (policy, expected) in [(SharingPolicy::Shared, 4.0), (SharingPolicy::Fatpipe, 2.0)] {
            let (mut kernel, net) = kernel();
            let l = link(&mut kernel, net, 10.0, 0.0, policy);
            let x = send(&mut kernel, net, &[l], 20.0);
            let y = send(&mut kernel, net, &[l], 20.0);
            assert_eq!(kernel.run_until_terminal(x).unwrap(), ActionState::Done);
            assert_eq!(kernel.current_clock(), expected);
            assert_eq!(kernel.action_state(y), ActionState::Done);
        }
    }

    #[test]
    fn rate_caps_the_transfer() {
        let (mut kernel, net) = kernel();
        let l = link(&mut kernel, net, 100.0, 0.0, SharingPolicy::Shared);
        let id = kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, &[l], 50.0, Some(10.0)))
            .unwrap();
        assert_eq!(kernel.run_until_terminal(id).unwrap(), ActionState::Done);
        assert_eq!(kernel.current_clock(), 5.0);
    }

    #[test]
    fn empty_payload_arrives_after_latency() {
        let (mut kernel, net) = kernel();
        let l = link(&mut kernel, net, 1.0, 0.25, SharingPolicy::Shared);
        let id = send(&mut kernel, net, &[l], 0.0);
        assert_eq!(kernel.run_until_terminal(id).unwrap(), ActionState::Done);
        assert_eq!(kernel.current_clock(), 0.25);
    }

    #[test]
    fn link_failure_during_latency_fails_the_transfer() {
        let (mut kernel, net) = kernel();
        let l = link(&mut kernel, net, 1.0, 5.0, SharingPolicy::Shared);
        let id = kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| {
                m.state_trace(ctx, l, Trace::from_dates(&[(1.0, 0.0)])?, 0.0, None)?;
                m.communicate(ctx, &[l], 10.0, None)
            })
            .unwrap();
        assert_eq!(kernel.run_until_terminal(id).unwrap(), ActionState::Failed);
        assert_eq!(kernel.current_clock(), 1.0);
        assert_eq!(kernel.action(id).unwrap().remains(), 10.0);
    }

    #[test]
    fn latency_trace_affects_later_transfers() {
        let (mut kernel, net) = kernel();
        let l = link(&mut kernel, net, 10.0, 1.0, SharingPolicy::Shared);
        kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| {
                m.latency_trace(ctx, l, Trace::constant(3.0), 0.0, None)
            })
            .unwrap();
        kernel.solve(None).unwrap();
        let id = send(&mut kernel, net, &[l], 10.0);
        assert_eq!(kernel.run_until_terminal(id).unwrap(), ActionState::Done);
        assert_eq!(kernel.current_clock(), 4.0);
    }

    #[test]
    fn bad_routes_are_rejected() {
        let (mut kernel, net) = kernel();
        assert!(kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, &[], 1.0, None))
            .is_err());
        assert!(kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, &[ResourceId(3)], 1.0, None))
            .is_err());
        assert!(kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| {
                m.add_link(ctx, "bad", 1.0, -1.0, SharingPolicy::Shared)
            })
            .is_err());
    }
}
