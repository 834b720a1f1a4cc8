//! Lazy refinement of selectors, declarations and at-rules.
//!
//! Refinement parses the raw text a unit kept from eager parsing. Everything
//! the grammar broadcasts meanwhile is held in a paused queue, so the new
//! children are attached before anyone sees them; releasing the queue then
//! emits them in parse order.

use crate::ast::NodeId;
use crate::broadcast::{Chain, QueuingBroadcaster, Sender, StageId};
use crate::error::Result;

/// Units broadcast while a paused queue was on top of the sender.
pub struct Held {
    chain: Chain,
    queue: StageId,
    units: Vec<NodeId>,
}

impl Held {
    /// The held units that are not attached to a parent yet, in parse order.
    pub fn units(&self) -> &[NodeId] {
        &self.units
    }

    /// Every held unit, attached or not.
    pub fn queued(&self) -> Vec<NodeId> {
        self.chain
            .get::<QueuingBroadcaster>(self.queue)
            .map(|queue| queue.iter().collect())
            .unwrap_or_default()
    }

    /// Append the parentless held units to `parent`.
    pub fn attach(&self, parent: NodeId, sender: &mut Sender<'_, '_>) -> Result<()> {
        for unit in &self.units {
            sender.ast_mut().append(parent, *unit)?;
        }
        Ok(())
    }

    /// Flush the held units into the route below the sender's current top.
    pub fn release(mut self, sender: &mut Sender<'_, '_>) -> Result<()> {
        self.chain.resume(self.queue, sender)
    }
}

/// Run `parse` with a paused queue on top of `sender`.
pub fn hold<F>(sender: &mut Sender<'_, '_>, parse: F) -> Result<Held>
where
    F: FnOnce(&mut Sender<'_, '_>) -> Result<()>,
{
    let mut chain = Chain::new();
    let queue = chain.chain(QueuingBroadcaster::paused());
    sender.push(chain);
    let result = parse(sender);
    let chain = sender.pop().unwrap_or_default();
    result?;

    let units = chain
        .get::<QueuingBroadcaster>(queue)
        .map(|held| {
            held.iter()
                .filter(|unit| sender.ast().parent(*unit).is_none())
                .collect()
        })
        .unwrap_or_default();
    Ok(Held {
        chain,
        queue,
        units,
    })
}

/// Refine `unit` if it has not been refined yet.
///
/// The raw text must be consumed entirely. Calling this again, or on a unit
/// built without raw text, does nothing.
pub fn refine(unit: NodeId, sender: &mut Sender<'_, '_>) -> Result<NodeId> {
    let node = sender.ast().node(unit);
    if node.is_refined() || node.is_destroyed() {
        return Ok(unit);
    }
    log::debug!("refining {} {unit}", node.kind());

    let grammar = sender.grammar();
    let held = hold(sender, |sender| grammar.refine_content(unit, sender))?;
    held.attach(unit, sender)?;
    sender.ast_mut().mark_refined(unit);
    held.release(sender)?;
    Ok(unit)
}
