//! Broadcaster chains.
//!
//! Every parsed or created unit is announced with `broadcast`. The
//! announcement travels through a stack of [`Chain`]s held by a [`Sender`]:
//! the most recently pushed chain sees the unit first, each of its stages
//! records, filters or buffers it and forwards it to the next stage, and the
//! tail of a chain continues into the chain below. Under the bottom chain sits
//! the terminal: for a normal sender, the root chain of the [`Env`] followed
//! by the emitter, or nothing for a detached one.
//!
//! Stages are owned by their chain and addressed through [`StageId`] handles,
//! so a chain can be walked with plain `&mut` borrows while a unit is in
//! flight.

mod collectors;
mod queue;
mod single;
mod visiting;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use collectors::{
    CollectingBroadcaster, ConsumingBroadcaster, InterestBroadcaster, QueryableBroadcaster,
};
pub use queue::QueuingBroadcaster;
pub use single::SingleInterestBroadcaster;
pub use visiting::VisitingBroadcaster;

use crate::ast::{Ast, NodeId};
use crate::emitter::{self, Env};
use crate::error::{Result, SubscriptionError};
use crate::parser::Grammar;
use crate::status::{Phase, Status};

/// A stage of a broadcaster chain.
///
/// Implementations decide what happens to a unit and call
/// [`Next::forward`] to pass it on. Not forwarding drops the unit for the
/// rest of the chain.
pub trait Broadcaster: Any {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Handle to a stage inside a [`Chain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageId(u64);

impl StageId {
    fn fresh() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        StageId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct Stage {
    id: StageId,
    inner: Box<dyn Broadcaster>,
}

/// An ordered, owned sequence of stages.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from stages, in order.
    pub fn from_stages(stages: Vec<Box<dyn Broadcaster>>) -> Self {
        let mut chain = Chain::new();
        for stage in stages {
            chain.chain_boxed(stage);
        }
        chain
    }

    /// Append a stage at the tail of the chain.
    pub fn chain<B: Broadcaster>(&mut self, stage: B) -> StageId {
        self.chain_boxed(Box::new(stage))
    }

    pub fn chain_boxed(&mut self, stage: Box<dyn Broadcaster>) -> StageId {
        let id = StageId::fresh();
        self.stages.push(Stage { id, inner: stage });
        id
    }

    /// Remove exactly the stage `id`, wherever it sits. Returns `None` when the
    /// chain does not hold it.
    pub fn cut(&mut self, id: StageId) -> Option<Box<dyn Broadcaster>> {
        let index = self.position(id)?;
        Some(self.stages.remove(index).inner)
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.iter().map(|stage| stage.id)
    }

    /// Borrow the stage `id` as its concrete type.
    pub fn get<B: Broadcaster>(&self, id: StageId) -> Option<&B> {
        let index = self.position(id)?;
        self.stages[index].inner.as_any().downcast_ref::<B>()
    }

    pub fn get_mut<B: Broadcaster>(&mut self, id: StageId) -> Option<&mut B> {
        let index = self.position(id)?;
        self.stages[index].inner.as_any_mut().downcast_mut::<B>()
    }

    /// The first stage of type `B`.
    pub fn find<B: Broadcaster>(&self) -> Option<&B> {
        self.stages
            .iter()
            .find_map(|stage| stage.inner.as_any().downcast_ref::<B>())
    }

    /// Send `unit` through this chain, then through the layers of `sender`.
    pub fn broadcast(&mut self, unit: NodeId, sender: &mut Sender<'_, '_>) -> Result<()> {
        let mut next = Next {
            stages: &mut self.stages,
            below: &mut sender.layers,
            env: &mut *sender.env,
            emit: sender.emit,
        };
        next.forward(unit)
    }

    /// Flush the queuing stage `id` into the rest of this chain and then into
    /// the layers of `sender`.
    pub fn resume(&mut self, id: StageId, sender: &mut Sender<'_, '_>) -> Result<()> {
        self.resume_stage(id, &mut sender.layers, &mut *sender.env, sender.emit)
    }

    fn resume_stage(
        &mut self,
        id: StageId,
        below: &mut [Chain],
        env: &mut Env<'_>,
        emit: bool,
    ) -> Result<()> {
        let index = self.position(id).ok_or(SubscriptionError::MissingStage)?;
        let (head, tail) = self.stages.split_at_mut(index + 1);
        let queue = head[index]
            .inner
            .as_any_mut()
            .downcast_mut::<QueuingBroadcaster>()
            .ok_or(SubscriptionError::MissingStage)?;
        let mut next = Next {
            stages: tail,
            below,
            env,
            emit,
        };
        queue.resume(&mut next)
    }

    fn position(&self, id: StageId) -> Option<usize> {
        self.stages.iter().position(|stage| stage.id == id)
    }

    fn run(
        &mut self,
        unit: NodeId,
        below: &mut [Chain],
        env: &mut Env<'_>,
        emit: bool,
    ) -> Result<()> {
        let mut next = Next {
            stages: &mut self.stages,
            below,
            env,
            emit,
        };
        next.forward(unit)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// The remainder of the route of a unit in flight.
pub struct Next<'n, 'e> {
    stages: &'n mut [Stage],
    below: &'n mut [Chain],
    env: &'n mut Env<'e>,
    emit: bool,
}

impl Next<'_, '_> {
    /// Pass `unit` to the next stage, or past the end of the chain.
    pub fn forward(&mut self, unit: NodeId) -> Result<()> {
        match self.stages.split_first_mut() {
            Some((stage, rest)) => {
                let mut next = Next {
                    stages: rest,
                    below: &mut *self.below,
                    env: &mut *self.env,
                    emit: self.emit,
                };
                stage.inner.broadcast(unit, &mut next)
            }
            None => deliver(&mut *self.below, &mut *self.env, self.emit, unit),
        }
    }

    pub fn ast(&self) -> &Ast {
        self.env.ast()
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        self.env.ast_mut()
    }
}

fn deliver(layers: &mut [Chain], env: &mut Env<'_>, emit: bool, unit: NodeId) -> Result<()> {
    match layers.split_last_mut() {
        Some((top, below)) => top.run(unit, below, env, emit),
        None if !emit => Ok(()),
        None if env.routing => {
            env.reached.push(unit);
            Ok(())
        }
        None => route(env, |root, env| root.run(unit, &mut [], env, true)),
    }
}

/// Run `send` over the root chain of `env`, then emit whatever got past the
/// end of it, in order.
///
/// The root chain is out of the environment while its stages run, so units
/// reaching its tail are collected and emitted once it is back in place.
/// Broadcasts made by subscribers then travel through the root chain too.
fn route<F>(env: &mut Env<'_>, send: F) -> Result<()>
where
    F: FnOnce(&mut Chain, &mut Env<'_>) -> Result<()>,
{
    let mut root = env.take_root();
    env.routing = true;
    let sent = send(&mut root, env);
    env.routing = false;
    env.root = root;
    let reached = std::mem::take(&mut env.reached);
    sent?;
    for unit in reached {
        emitter::emit(unit, env)?;
    }
    Ok(())
}

/// The broadcaster handed to grammar rules and plugins.
pub struct Sender<'s, 'e> {
    env: &'s mut Env<'e>,
    layers: Vec<Chain>,
    emit: bool,
}

impl<'s, 'e> Sender<'s, 'e> {
    /// A sender whose units end up at the emitter.
    pub fn new(env: &'s mut Env<'e>) -> Self {
        Self {
            env,
            layers: Vec::new(),
            emit: true,
        }
    }

    /// A sender whose units are dropped after its chains have seen them.
    pub fn detached(env: &'s mut Env<'e>) -> Self {
        Self {
            env,
            layers: Vec::new(),
            emit: false,
        }
    }

    /// Put `chain` on top; it sees every unit before the chains below.
    pub fn push(&mut self, chain: Chain) {
        self.layers.push(chain);
    }

    pub fn pop(&mut self) -> Option<Chain> {
        self.layers.pop()
    }

    pub fn top(&self) -> Option<&Chain> {
        self.layers.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Chain> {
        self.layers.last_mut()
    }

    pub fn is_detached(&self) -> bool {
        !self.emit
    }

    pub fn broadcast(&mut self, unit: NodeId) -> Result<()> {
        deliver(&mut self.layers, &mut *self.env, self.emit, unit)
    }

    /// Broadcast exactly one unit through `stages` placed in front of the
    /// current route, then hand the stages back.
    pub fn chain_broadcast(
        &mut self,
        unit: NodeId,
        stages: Vec<Box<dyn Broadcaster>>,
    ) -> Result<Chain> {
        self.push(Chain::from_stages(stages));
        let result = self.broadcast(unit);
        let chain = self.pop().unwrap_or_default();
        result.map(|_| chain)
    }

    /// Flush the queuing stage `id` held by one of the pushed chains or by
    /// the root chain.
    pub fn resume(&mut self, id: StageId) -> Result<()> {
        match self.layers.iter().rposition(|chain| chain.contains(id)) {
            Some(layer) => {
                let (below, rest) = self.layers.split_at_mut(layer);
                rest[0].resume_stage(id, below, &mut *self.env, self.emit)
            }
            None if self.emit && self.env.root.contains(id) => {
                route(&mut *self.env, |root, env| root.resume_stage(id, &mut [], env, true))
            }
            None => Err(SubscriptionError::MissingStage.into()),
        }
    }

    pub fn ast(&self) -> &Ast {
        self.env.ast()
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        self.env.ast_mut()
    }

    pub fn grammar(&self) -> &'e Grammar {
        self.env.grammar()
    }

    pub fn phase(&self) -> Phase {
        self.env.phase()
    }

    pub(crate) fn env_mut(&mut self) -> &mut Env<'e> {
        &mut *self.env
    }
}

/// Forwards everything.
#[derive(Debug, Default)]
pub struct RelayBroadcaster;

impl Broadcaster for RelayBroadcaster {
    fn broadcast(&mut self, unit: NodeId, next: &mut Next<'_, '_>) -> Result<()> {
        next.forward(unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Broadcast `unit` and then its sub-tree, pre-order, through `sender`.
///
/// Destroyed units and their sub-trees are skipped. Units whose status does
/// not pass `filter` are not broadcast but their children are still visited.
/// Children are read after the parent has been broadcast, so subscribers
/// reworking the parent decide what gets visited next.
pub fn propagate(
    unit: NodeId,
    sender: &mut Sender<'_, '_>,
    filter: &dyn Fn(Status) -> bool,
) -> Result<()> {
    let status = sender.ast().status(unit);
    if status == Status::NeverEmit {
        return Ok(());
    }
    if filter(status) {
        sender.broadcast(unit)?;
    }
    let children = sender.ast().children(unit).to_vec();
    for child in children {
        propagate(child, sender, filter)?;
    }
    Ok(())
}
