//! Per-state membership sets.

use crate::action::ActionState;
use indexmap::IndexSet;
use weir_core::ActionId;

/// One model's actions, split by state. An action is in at most one set.
#[derive(Clone, Debug, Default)]
pub(crate) struct StateSets {
    ready: IndexSet<ActionId>,
    running: IndexSet<ActionId>,
    failed: IndexSet<ActionId>,
    done: IndexSet<ActionId>,
}

impl StateSets {
    pub fn set(&self, state: ActionState) -> Option<&IndexSet<ActionId>> {
        match state {
            ActionState::Ready => Some(&self.ready),
            ActionState::Running => Some(&self.running),
            ActionState::Failed => Some(&self.failed),
            ActionState::Done => Some(&self.done),
            ActionState::ToFree | ActionState::NotInSystem => None,
        }
    }

    fn set_mut(&mut self, state: ActionState) -> Option<&mut IndexSet<ActionId>> {
        match state {
            ActionState::Ready => Some(&mut self.ready),
            ActionState::Running => Some(&mut self.running),
            ActionState::Failed => Some(&mut self.failed),
            ActionState::Done => Some(&mut self.done),
            ActionState::ToFree | ActionState::NotInSystem => None,
        }
    }

    /// Remove from the `from` set, then insert into the `to` set.
    ///
    /// Removal keeps the relative order of the remaining members.
    pub fn relocate(&mut self, id: ActionId, from: ActionState, to: ActionState) {
        if let Some(set) = self.set_mut(from) {
            set.shift_remove(&id);
        }
        if let Some(set) = self.set_mut(to) {
            set.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ready.len() + self.running.len() + self.failed.len() + self.done.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_core::Handle;

    #[test]
    fn relocate_moves_between_sets() {
        let mut sets = StateSets::default();
        let a = ActionId::from_raw(1);
        let b = ActionId::from_raw(2);
        sets.relocate(a, ActionState::NotInSystem, ActionState::Running);
        sets.relocate(b, ActionState::NotInSystem, ActionState::Running);
        sets.relocate(a, ActionState::Running, ActionState::Done);
        assert_eq!(sets.set(ActionState::Running).unwrap().len(), 1);
        assert!(sets.set(ActionState::Done).unwrap().contains(&a));
        sets.relocate(a, ActionState::Done, ActionState::ToFree);
        assert_eq!(sets.len(), 1);
    }
}
