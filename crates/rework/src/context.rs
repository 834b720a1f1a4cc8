//! What rework and refine handlers get to change the tree with.

use crate::ast::{Ast, Kind, NodeId, Syntax};
use crate::broadcast::{self, Broadcaster, Chain, Sender, SingleInterestBroadcaster};
use crate::emitter::Env;
use crate::error::{Message, ParserError, Result};
use crate::error_manager::ErrorManager;
use crate::parser::{Grammar, Source};
use crate::refine;
use crate::status::{Phase, Status};

/// Mutable access to the tree during dispatch.
///
/// Units inserted through the context are announced right away when their
/// new parent has already been broadcast, so they go through the same phases
/// as parsed units. Units inserted under a parent that has not been broadcast
/// yet are picked up when the parent is.
pub struct Context<'c, 'e> {
    env: &'c mut Env<'e>,
}

impl<'c, 'e> Context<'c, 'e> {
    pub fn new(env: &'c mut Env<'e>) -> Self {
        Self { env }
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

    pub fn errors_mut(&mut self) -> &mut dyn ErrorManager {
        self.env.errors_mut()
    }

    /// A sender routed through the root chain to the emitter.
    pub fn sender(&mut self) -> Sender<'_, 'e> {
        Sender::new(&mut *self.env)
    }

    pub fn broadcast(&mut self, unit: NodeId) -> Result<()> {
        self.sender().broadcast(unit)
    }

    /// Broadcast `unit` and its sub-tree, skipping whatever already went
    /// through the active phase.
    pub fn propagate(&mut self, unit: NodeId) -> Result<()> {
        let done = self.phase().completed();
        broadcast::propagate(unit, &mut self.sender(), &move |status: Status| status < done)
    }

    pub fn chain_broadcast(
        &mut self,
        unit: NodeId,
        stages: Vec<Box<dyn Broadcaster>>,
    ) -> Result<Chain> {
        self.sender().chain_broadcast(unit, stages)
    }

    pub fn refine(&mut self, unit: NodeId) -> Result<NodeId> {
        refine::refine(unit, &mut self.sender())
    }

    /// Create a detached unit with no source position.
    pub fn create(&mut self, syntax: Syntax) -> NodeId {
        self.ast_mut().create(syntax, None)
    }

    pub fn copy(&mut self, unit: NodeId) -> NodeId {
        self.ast_mut().copy(unit)
    }

    pub fn append(&mut self, parent: NodeId, unit: NodeId) -> Result<()> {
        self.ast_mut().append(parent, unit)?;
        self.announce(unit)
    }

    pub fn prepend(&mut self, parent: NodeId, unit: NodeId) -> Result<()> {
        self.ast_mut().prepend(parent, unit)?;
        self.announce(unit)
    }

    pub fn insert_before(&mut self, anchor: NodeId, unit: NodeId) -> Result<()> {
        self.ast_mut().insert_before(anchor, unit)?;
        self.announce(unit)
    }

    pub fn insert_after(&mut self, anchor: NodeId, unit: NodeId) -> Result<()> {
        self.ast_mut().insert_after(anchor, unit)?;
        self.announce(unit)
    }

    pub fn replace(&mut self, existing: NodeId, replacement: NodeId) -> Result<()> {
        self.ast_mut().replace(existing, replacement)?;
        self.announce(replacement)
    }

    pub fn move_before(&mut self, unit: NodeId, anchor: NodeId) -> Result<()> {
        Ok(self.ast_mut().move_before(unit, anchor)?)
    }

    pub fn move_after(&mut self, unit: NodeId, anchor: NodeId) -> Result<()> {
        Ok(self.ast_mut().move_after(unit, anchor)?)
    }

    pub fn destroy(&mut self, unit: NodeId) {
        log::trace!("destroying {unit}");
        self.ast_mut().destroy(unit);
    }

    fn announce(&mut self, unit: NodeId) -> Result<()> {
        let parent_seen = self
            .ast()
            .parent(unit)
            .is_some_and(|parent| self.ast().status(parent) >= Status::Emitting);
        if parent_seen {
            self.propagate(unit)?;
        }
        Ok(())
    }

    /// Parse a detached, unrefined selector from `text`.
    pub fn parse_selector(&mut self, text: &str) -> Result<NodeId> {
        self.parse_one(text, Kind::Selector, Message::ExpectedSelector)
    }

    /// Parse a detached, unrefined declaration from `text`.
    pub fn parse_declaration(&mut self, text: &str) -> Result<NodeId> {
        self.parse_one(text, Kind::Declaration, Message::ExpectedDeclaration)
    }

    fn parse_one(&mut self, text: &str, kind: Kind, missing: Message) -> Result<NodeId> {
        let grammar = self.grammar();
        let mut sender = Sender::detached(&mut *self.env);
        let mut chain = Chain::new();
        let guard = chain.chain(SingleInterestBroadcaster::new(kind));
        sender.push(chain);

        let mut source = Source::new(text);
        let parsed = match kind {
            Kind::Declaration => grammar.declaration(&mut source, &mut sender),
            _ => grammar.selector(&mut source, &mut sender),
        };
        let chain = sender.pop().unwrap_or_default();
        parsed?;
        source.expect_consumed()?;

        chain
            .get::<SingleInterestBroadcaster>(guard)
            .and_then(SingleInterestBroadcaster::one)
            .ok_or_else(|| ParserError::new(source.position(), missing).into())
    }
}
