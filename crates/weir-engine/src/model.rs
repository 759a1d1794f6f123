//! The [`ResourceModel`] trait: one kind of resource (CPUs, links, timers).

use crate::context::ModelContext;
use crate::error::ModelError;
use std::any::Any;
use weir_core::{ResourceId, TraceEvent};

/// A pluggable kind of resource driven by the [`Kernel`](crate::Kernel).
///
/// # Contract
///
/// - Models are called in registration order, every step.
/// - [`share_resources`](Self::share_resources) only reads: it reports the
///   time until the model's next internal event and must not move actions.
/// - [`update_actions_state`](Self::update_actions_state) charges progress
///   at the rates solved *before* the step's trace events were applied.
///   [`ModelContext::update_running`] does exactly that.
/// - Hooks a model cannot support return [`ModelError::Unimplemented`];
///   the kernel propagates it out of [`Kernel::solve`](crate::Kernel::solve).
///
/// # Examples
///
/// A model whose actions are plain solver variables:
///
/// ```
/// use weir_engine::{ModelContext, ModelError, ResourceModel};
///
/// struct Plain;
///
/// impl ResourceModel for Plain {
///     fn name(&self) -> &str { "plain" }
///
///     fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
///         ctx.share_running()
///     }
///
///     fn update_actions_state(&mut self, ctx: &mut ModelContext<'_>, delta: f64) -> Result<(), ModelError> {
///         ctx.update_running(delta)
///     }
/// }
///
/// assert_eq!(Plain.name(), "plain");
/// ```
pub trait ResourceModel: Any {
    /// Human-readable name for errors and logs.
    fn name(&self) -> &str;

    /// Time until the earliest completion among this model's actions, or
    /// `None` if nothing it owns is pending.
    fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError>;

    /// Advance every running action by `delta` seconds of simulated time
    /// and apply the resulting terminal transitions.
    fn update_actions_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        delta: f64,
    ) -> Result<(), ModelError>;

    /// Apply one external trace event to a resource of this model.
    fn update_resource_state(
        &mut self,
        ctx: &mut ModelContext<'_>,
        event: &TraceEvent,
    ) -> Result<(), ModelError> {
        let _ = (ctx, event);
        Err(self.unimplemented("update_resource_state"))
    }

    /// Whether running actions currently consume `resource`.
    ///
    /// Events on a used resource cut the step short so that rates change
    /// exactly at the event date.
    fn resource_used(&self, ctx: &ModelContext<'_>, resource: ResourceId) -> Result<bool, ModelError> {
        let _ = (ctx, resource);
        Err(self.unimplemented("resource_used"))
    }

    /// Release model-owned state when the kernel shuts down.
    ///
    /// Default: nothing to release.
    fn finalize(&mut self, ctx: &mut ModelContext<'_>) -> Result<(), ModelError> {
        let _ = ctx;
        Ok(())
    }

    /// The error every unsupported hook returns.
    fn unimplemented(&self, operation: &'static str) -> ModelError {
        ModelError::Unimplemented {
            model: self.name().to_string(),
            operation,
        }
    }
}

impl dyn ResourceModel {
    /// Downcast to a concrete model type.
    pub fn downcast_ref<T: ResourceModel>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete model type.
    pub fn downcast_mut<T: ResourceModel>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}
