//! A network where every transfer takes the same time.
//!
//! There is no bandwidth sharing: a transfer of `size` bytes runs alone at
//! `size / latency` bytes per second, so it completes exactly `latency`
//! seconds after it starts whatever else is in flight.

use weir_action::{ActionSpec, ActionState};
use weir_core::ActionId;
use weir_engine::{ModelContext, ModelError, ResourceModel};

/// The constant-latency network model.
#[derive(Clone, Debug)]
pub struct ConstantNetworkModel {
    latency: f64,
}

impl ConstantNetworkModel {
    /// Every transfer takes `latency` seconds.
    pub fn new(latency: f64) -> Result<Self, ModelError> {
        if !latency.is_finite() || latency < 0.0 {
            return Err(ModelError::InvalidArgument {
                reason: format!("latency must be finite and non-negative, got {latency}"),
            });
        }
        Ok(Self { latency })
    }

    /// The fixed latency.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Start a transfer of `size` bytes.
    ///
    /// With a zero latency the transfer is `Done` on return.
    pub fn communicate(
        &mut self,
        ctx: &mut ModelContext<'_>,
        size: f64,
    ) -> Result<ActionId, ModelError> {
        if self.latency == 0.0 {
            let id = ctx.create_action(ActionSpec::new(size))?;
            ctx.start_action(id)?;
            ctx.finish_action(id, ActionState::Done)?;
            return Ok(id);
        }
        let spec = ActionSpec::new(size)
            .bound(size / self.latency)
            .max_duration(self.latency);
        let id = ctx.create_action(spec)?;
        ctx.start_action(id)?;
        Ok(id)
    }
}

impl ResourceModel for ConstantNetworkModel {
    fn name(&self) -> &str {
        "constant-network"
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
}
