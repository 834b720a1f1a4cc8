use std::any::Any;

use super::{propagate, Broadcaster, Next, Sender};
use crate::ast::NodeId;
use crate::error::Result;
use crate::status::Status;
use crate::subscription::EventType;

/// Remembers the latest unit it saw so the sub-tree can be replayed later.
#[derive(Debug, Default)]
pub struct VisitingBroadcaster {
    event: Option<EventType>,
    target: Option<NodeId>,
    locked: bool,
}

impl VisitingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only units matching `event` become the target.
    pub fn of(event: impl Into<EventType>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Stop updating the target.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn reset(&mut self) {
        self.target = None;
        self.locked = false;
    }

    /// Lock and replay the target's sub-tree through `sender`, broadcasting
    /// every unit whose status passes `filter`.
    pub fn visit(
        &mut self,
        sender: &mut Sender<'_, '_>,
        filter: impl Fn(Status) -> bool,
    ) -> Result<()> {
        self.lock();
        match self.target {
            Some(target) => propagate(target, sender, &filter),
            None => Ok(()),
        }
    }
}

impl Broadcaster for VisitingBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        let wanted = self
            .event
            .is_none_or(|event| event.matches(next.ast().kind(unit)));
        if wanted && !self.locked {
            self.target = Some(unit);
        }
        next.forward(unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
