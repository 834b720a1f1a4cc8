use std::any::Any;
use std::collections::{HashSet, VecDeque};

use super::{Broadcaster, Next};
use crate::ast::NodeId;
use crate::error::Result;
use crate::status::Status;

/// Buffers units while paused and forwards them in FIFO order on resume.
///
/// Queued units can be rejected before the flush; they are dropped instead of
/// forwarded. The rejection set is cleared after every flush.
#[derive(Debug, Default)]
pub struct QueuingBroadcaster {
    paused: bool,
    queue: VecDeque<NodeId>,
    rejected: HashSet<NodeId>,
}

impl QueuingBroadcaster {
    /// A queue that forwards immediately until paused.
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that starts out paused.
    pub fn paused() -> Self {
        Self {
            paused: true,
            ..Self::default()
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Drop `unit` at the next flush instead of forwarding it.
    pub fn reject(&mut self, unit: NodeId) {
        self.rejected.insert(unit);
    }

    pub fn is_rejected(&self, unit: NodeId) -> bool {
        self.rejected.contains(&unit)
    }

    pub fn peek_first(&self) -> Option<NodeId> {
        self.queue.front().copied()
    }

    pub fn peek_last(&self) -> Option<NodeId> {
        self.queue.back().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.queue.iter().copied()
    }

    /// Switch to ready and flush the queue into `next`.
    ///
    /// Units are taken off the queue one at a time, so a failed forward
    /// leaves the rest queued for another resume.
    pub fn resume(&mut self, next: &mut Next<'_, '_>) -> Result<()> {
        self.paused = false;
        log::trace!("flushing {} queued units", self.queue.len());
        while let Some(unit) = self.queue.pop_front() {
            if self.rejected.contains(&unit) {
                continue;
            }
            next.forward(unit)?;
        }
        self.rejected.clear();
        Ok(())
    }
}

impl Broadcaster for QueuingBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        if self.paused {
            next.ast_mut().advance(unit, Status::Queued);
            self.queue.push_back(unit);
            Ok(())
        } else {
            next.forward(unit)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
