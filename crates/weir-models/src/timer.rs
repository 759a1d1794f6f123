//! Commands scheduled at simulated dates.
//!
//! [`TimerModel::set`] attaches a one-shot wake-up trace at the requested
//! date. When the driver applies it the command moves to the fired queue,
//! where the consumer picks it up with [`TimerModel::take_fired`]. The
//! model owns no actions.

use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::trace;
use weir_core::{ResourceId, Signal, StreamId, TraceEvent};
use weir_engine::{ModelContext, ModelError, ResourceModel};
use weir_trace::Trace;

#[derive(Clone, Debug)]
struct Pending<C> {
    date: f64,
    stream: StreamId,
    command: C,
}

/// The timer model, carrying commands of type `C`.
#[derive(Clone, Debug)]
pub struct TimerModel<C> {
    pending: IndexMap<ResourceId, Pending<C>>,
    fired: VecDeque<C>,
    next: u32,
}

impl<C> Default for TimerModel<C> {
    fn default() -> Self {
        Self {
            pending: IndexMap::new(),
            fired: VecDeque::new(),
            next: 0,
        }
    }
}

impl<C: 'static> TimerModel<C> {
    /// A model with no timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `command` at `date`. Returns a handle for [`cancel`](Self::cancel).
    pub fn set(
        &mut self,
        ctx: &mut ModelContext<'_>,
        date: f64,
        command: C,
    ) -> Result<ResourceId, ModelError> {
        let id = ResourceId(self.next);
        let stream = ctx.add_trace(id, Signal::Wakeup, Trace::constant(1.0), date, None)?;
        self.next += 1;
        self.pending.insert(
            id,
            Pending {
                date,
                stream,
                command,
            },
        );
        trace!(timer = %id, date, "timer set");
        Ok(id)
    }

    /// Drop a timer that has not fired yet, returning its command.
    pub fn cancel(&mut self, ctx: &mut ModelContext<'_>, timer: ResourceId) -> Option<C> {
        let pending = self.pending.shift_remove(&timer)?;
        ctx.remove_trace(pending.stream);
        Some(pending.command)
    }

    /// The oldest fired command not yet taken.
    pub fn take_fired(&mut self) -> Option<C> {
        self.fired.pop_front()
    }

    /// Every fired command not yet taken, oldest first.
    pub fn drain_fired(&mut self) -> Vec<C> {
        self.fired.drain(..).collect()
    }

    /// Number of timers still to fire.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl<C: 'static> ResourceModel for TimerModel<C> {
    fn name(&self) -> &str {
        "timer"
    }

    fn share_resources(&mut self, ctx: &mut ModelContext<'_>) -> Result<Option<f64>, ModelError> {
        let now = ctx.now();
        Ok(self
            .pending
            .values()
            .map(|p| (p.date - now).max(0.0))
            .min_by(f64::total_cmp))
    }

    fn update_actions_state(
        &mut self,
        _ctx: &mut ModelContext<'_>,
        _delta: f64,
    ) -> Result<(), ModelError> {
        Ok(())
    }

    fn update_resource_state(
        &mut self,
        _ctx: &mut ModelContext<'_>,
        event: &TraceEvent,
    ) -> Result<(), ModelError> {
        let timer = event.resource.resource;
        if event.resource.signal != Signal::Wakeup {
            return Err(ModelError::UnsupportedSignal {
                resource: timer,
                signal: event.resource.signal,
            });
        }
        let pending = self
            .pending
            .shift_remove(&timer)
            .ok_or(ModelError::UnknownResource(timer))?;
        trace!(timer = %timer, date = event.date, "timer fired");
        self.fired.push_back(pending.command);
        Ok(())
    }

    /// Timers always stop the clock at their date.
    fn resource_used(&self, _ctx: &ModelContext<'_>, _resource: ResourceId) -> Result<bool, ModelError> {
        Ok(true)
    }

    fn finalize(&mut self, ctx: &mut ModelContext<'_>) -> Result<(), ModelError> {
        for (_, pending) in self.pending.drain(..) {
            ctx.remove_trace(pending.stream);
        }
        self.fired.clear();
        Ok(())
    }
}
