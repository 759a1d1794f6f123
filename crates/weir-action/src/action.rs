//! The action record and its creation parameters.

use smallvec::SmallVec;
use std::fmt;
use weir_core::{ConstraintId, ModelId, VariableId};

/// Lifecycle state of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionState {
    /// Created, not yet consuming anything.
    Ready,
    /// Attached to its constraints and progressing (or suspended).
    Running,
    /// Cancelled, or one of its resources went down.
    Failed,
    /// All work done, or its maximum duration elapsed.
    Done,
    /// The last reference was just released; the action is being destroyed.
    ToFree,
    /// The handle no longer refers to a live action.
    NotInSystem,
}

impl ActionState {
    /// `Failed` or `Done`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Done)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Done => "done",
            Self::ToFree => "to-free",
            Self::NotInSystem => "not-in-system",
        };
        f.write_str(name)
    }
}

/// What a model asks for when it creates an action.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionSpec {
    /// Total work (flops, bytes).
    pub cost: f64,
    /// Fairness weight of the underlying variable.
    pub priority: f64,
    /// Own rate cap.
    pub bound: Option<f64>,
    /// Simulated time after which the action completes regardless of work.
    pub max_duration: Option<f64>,
    /// `(constraint, coefficient)` pairs the variable consumes. Repeated
    /// constraints accumulate their coefficients.
    pub consumes: SmallVec<[(ConstraintId, f64); 4]>,
}

impl ActionSpec {
    /// An action of `cost` units with priority 1 and no caps.
    pub fn new(cost: f64) -> Self {
        Self {
            cost,
            priority: 1.0,
            bound: None,
            max_duration: None,
            consumes: SmallVec::new(),
        }
    }

    /// Set the fairness weight.
    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Cap the rate.
    pub fn bound(mut self, bound: f64) -> Self {
        self.bound = Some(bound);
        self
    }

    /// Cap the duration.
    pub fn max_duration(mut self, duration: f64) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Consume `coefficient` units of `constraint` per unit of rate.
    pub fn consume(mut self, constraint: ConstraintId, coefficient: f64) -> Self {
        self.consumes.push((constraint, coefficient));
        self
    }
}

/// One action. Read-only outside [`ActionTable`](crate::ActionTable).
#[derive(Clone, Debug)]
pub struct Action {
    pub(crate) model: ModelId,
    pub(crate) cost: f64,
    pub(crate) remains: f64,
    pub(crate) start_time: Option<f64>,
    pub(crate) finish_time: Option<f64>,
    pub(crate) max_duration: Option<f64>,
    pub(crate) priority: f64,
    pub(crate) bound: Option<f64>,
    pub(crate) state: ActionState,
    pub(crate) suspended: bool,
    pub(crate) gated: bool,
    pub(crate) refcount: u32,
    pub(crate) variable: VariableId,
    pub(crate) last_update: f64,
    pub(crate) tag: u64,
}

impl Action {
    /// Model that created the action.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Total work.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Work left as of the last refresh.
    pub fn remains(&self) -> f64 {
        self.remains
    }

    /// Clock at which the action started running.
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Clock at which the action reached a terminal state.
    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Simulated time left before a forced completion.
    pub fn max_duration(&self) -> Option<f64> {
        self.max_duration
    }

    /// Fairness weight requested for the action.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Own rate cap.
    pub fn bound(&self) -> Option<f64> {
        self.bound
    }

    /// Current state.
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Whether the action was suspended by its consumer.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Whether the owning model is holding the action back (a latency
    /// phase, a sleep).
    pub fn is_gated(&self) -> bool {
        self.gated
    }

    /// Number of outstanding references.
    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// The solver variable backing the action.
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    /// Opaque value attached by the consumer.
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Weight the variable should carry right now.
    pub(crate) fn effective_weight(&self) -> f64 {
        if self.suspended || self.gated {
            0.0
        } else {
            self.priority
        }
    }
}
