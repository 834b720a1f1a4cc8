//! Stages that record what passes through them. All of them forward every
//! unit.

use std::any::Any;

use super::{Broadcaster, Next};
use crate::ast::{Ast, Kind, NodeId};
use crate::error::{Result, SubscriptionError};
use crate::subscription::EventType;

/// Logs every unit it sees, in order.
#[derive(Debug, Default)]
pub struct QueryableBroadcaster {
    log: Vec<(NodeId, Kind)>,
}

impl QueryableBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unit seen so far.
    pub fn units(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.log.iter().map(|(unit, _)| *unit)
    }

    /// Units matching `event`, in broadcast order.
    pub fn filter(&self, event: impl Into<EventType>) -> Vec<NodeId> {
        let event = event.into();
        self.log
            .iter()
            .filter(|(_, kind)| event.matches(*kind))
            .map(|(unit, _)| *unit)
            .collect()
    }

    /// The first unit matching `event`.
    pub fn find(&self, event: impl Into<EventType>) -> Option<NodeId> {
        let event = event.into();
        self.log
            .iter()
            .find(|(_, kind)| event.matches(*kind))
            .map(|(unit, _)| *unit)
    }

    /// The only unit matching `event`; more than one is an error.
    pub fn find_only(
        &self,
        event: impl Into<EventType>,
    ) -> std::result::Result<Option<NodeId>, SubscriptionError> {
        let found = self.filter(event);
        match found.len() {
            0 => Ok(None),
            1 => Ok(Some(found[0])),
            count => Err(SubscriptionError::MultipleFound { count }),
        }
    }

    pub fn count(&self, event: impl Into<EventType>) -> usize {
        self.filter(event).len()
    }

    pub fn has(&self, event: impl Into<EventType>) -> bool {
        self.find(event).is_some()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl Broadcaster for QueryableBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        self.log.push((unit, next.ast().kind(unit)));
        next.forward(unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Keeps the first unit matching an event type.
#[derive(Debug)]
pub struct InterestBroadcaster {
    event: EventType,
    found: Option<NodeId>,
}

impl InterestBroadcaster {
    pub fn new(event: impl Into<EventType>) -> Self {
        Self {
            event: event.into(),
            found: None,
        }
    }

    pub fn found(&self) -> Option<NodeId> {
        self.found
    }

    pub fn reset(&mut self) {
        self.found = None;
    }
}

impl Broadcaster for InterestBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        if self.found.is_none() && self.event.matches(next.ast().kind(unit)) {
            self.found = Some(unit);
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

/// Keeps every unit matching an event type.
#[derive(Debug)]
pub struct CollectingBroadcaster {
    event: EventType,
    found: Vec<NodeId>,
}

impl CollectingBroadcaster {
    pub fn new(event: impl Into<EventType>) -> Self {
        Self {
            event: event.into(),
            found: Vec::new(),
        }
    }

    pub fn found(&self) -> &[NodeId] {
        &self.found
    }

    pub fn take(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.found)
    }
}

impl Broadcaster for CollectingBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        if self.event.matches(next.ast().kind(unit)) {
            self.found.push(unit);
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

type Condition = Box<dyn Fn(&Ast, NodeId) -> bool>;
type Callback = Box<dyn FnMut(&Ast, NodeId)>;

/// Hands every matching unit to a callback before forwarding it.
pub struct ConsumingBroadcaster {
    event: EventType,
    condition: Option<Condition>,
    callback: Callback,
}

impl ConsumingBroadcaster {
    pub fn new(event: impl Into<EventType>, callback: impl FnMut(&Ast, NodeId) + 'static) -> Self {
        Self {
            event: event.into(),
            condition: None,
            callback: Box::new(callback),
        }
    }

    /// Only consume units for which `condition` holds.
    pub fn when(mut self, condition: impl Fn(&Ast, NodeId) -> bool + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }
}

impl Broadcaster for ConsumingBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        let ast = next.ast();
        let wanted = self.event.matches(ast.kind(unit))
            && self.condition.as_ref().is_none_or(|condition| condition(ast, unit));
        if wanted {
            (self.callback)(ast, unit);
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
