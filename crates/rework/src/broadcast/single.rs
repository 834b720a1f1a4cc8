use std::any::Any;

use super::{Broadcaster, Next};
use crate::ast::{Kind, NodeId};
use crate::error::{Result, SubscriptionError};

/// Accepts exactly one unit of one kind.
///
/// Used when text is parsed on demand and the caller expects a single unit
/// back, e.g. a selector built from a string by a plugin.
#[derive(Debug)]
pub struct SingleInterestBroadcaster {
    expected: Kind,
    unit: Option<NodeId>,
}

impl SingleInterestBroadcaster {
    pub fn new(expected: Kind) -> Self {
        Self {
            expected,
            unit: None,
        }
    }

    pub fn one(&self) -> Option<NodeId> {
        self.unit
    }

    pub fn reset(&mut self) {
        self.unit = None;
    }
}

impl Broadcaster for SingleInterestBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        if self.unit.is_some() {
            return Err(SubscriptionError::SecondUnit(unit).into());
        }
        let actual = next.ast().kind(unit);
        if actual != self.expected {
            return Err(SubscriptionError::UnexpectedKind {
                expected: self.expected,
                actual,
            }
            .into());
        }
        self.unit = Some(unit);
        next.forward(unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
