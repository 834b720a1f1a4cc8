//! The terminal of every normal broadcaster chain.
//!
//! [`emit`] runs the subscriptions matching a unit for each phase up to the
//! active one, in order, and advances the unit's status as phases complete.
//! Everything the dispatch needs travels in an explicit [`Env`], including the
//! root chain every emitted unit passes through first.

use std::collections::HashSet;

use crate::ast::{Ast, NodeId};
use crate::broadcast::Chain;
use crate::error::{Error, Result, SubscriptionError};
use crate::error_manager::ErrorManager;
use crate::parser::Grammar;
use crate::status::{Phase, Status};
use crate::subscription::{Registry, Subscription};

/// Dispatch environment: the tree, the subscriptions, the grammar used for
/// refinement, the error sink, the active phase and the root chain.
pub struct Env<'e> {
    ast: &'e mut Ast,
    registry: &'e Registry,
    grammar: &'e Grammar,
    errors: &'e mut dyn ErrorManager,
    phase: Phase,
    pub(crate) root: Chain,
    pub(crate) routing: bool,
    pub(crate) reached: Vec<NodeId>,
    in_flight: HashSet<NodeId>,
}

impl<'e> Env<'e> {
    pub fn new(
        ast: &'e mut Ast,
        registry: &'e Registry,
        grammar: &'e Grammar,
        errors: &'e mut dyn ErrorManager,
        phase: Phase,
    ) -> Self {
        Self {
            ast,
            registry,
            grammar,
            errors,
            phase,
            root: Chain::new(),
            routing: false,
            reached: Vec::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Route every unit that reaches the emitter through `root` first.
    pub fn with_root(mut self, root: Chain) -> Self {
        self.root = root;
        self
    }

    pub fn root(&self) -> &Chain {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Chain {
        &mut self.root
    }

    /// Hand back the root chain, leaving units to go straight to the emitter.
    pub fn take_root(&mut self) -> Chain {
        std::mem::take(&mut self.root)
    }

    pub fn ast(&self) -> &Ast {
        &*self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut *self.ast
    }

    pub fn registry(&self) -> &'e Registry {
        self.registry
    }

    pub fn grammar(&self) -> &'e Grammar {
        self.grammar
    }

    pub fn errors(&self) -> &dyn ErrorManager {
        &*self.errors
    }

    pub fn errors_mut(&mut self) -> &mut dyn ErrorManager {
        &mut *self.errors
    }

    /// The last phase units are dispatched for.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn split(&mut self) -> (&Ast, &mut dyn ErrorManager) {
        (&*self.ast, &mut *self.errors)
    }
}

/// Dispatch `unit` to its subscribers for every phase up to the active one.
///
/// A unit that is already being dispatched is not dispatched again.
pub fn emit(unit: NodeId, env: &mut Env<'_>) -> Result<()> {
    if !env.in_flight.insert(unit) {
        log::trace!("{unit} is already being emitted");
        return Ok(());
    }
    let result = emit_phases(unit, env);
    env.in_flight.remove(&unit);
    result
}

fn emit_phases(unit: NodeId, env: &mut Env<'_>) -> Result<()> {
    let registry = env.registry;
    let active = env.phase;

    for phase in active.through() {
        if !env.ast.status(unit).should_broadcast(phase) {
            continue;
        }
        env.ast.advance(unit, Status::Emitting);

        let kind = env.ast.kind(unit);
        log::trace!("emit {kind} {unit} ({phase})");

        for subscription in registry.resolve(kind, phase) {
            let node = env.ast.node(unit);
            if node.breaks_broadcast(phase) {
                break;
            }
            if !subscription.accepts(node) {
                continue;
            }
            dispatch(subscription, unit, env)?;
        }

        if env.ast.node(unit).is_destroyed() {
            return Ok(());
        }
        env.ast.advance(unit, phase.completed());
    }
    Ok(())
}

fn dispatch(subscription: &Subscription, unit: NodeId, env: &mut Env<'_>) -> Result<()> {
    log::trace!("{} handles {unit}", subscription);
    match subscription.invoke(unit, env) {
        Ok(()) => Ok(()),
        Err(error @ Error::Parse(_)) => {
            env.errors.report_error(error);
            Ok(())
        }
        Err(Error::Subscription(error)) if !error.is_configuration() => {
            env.errors.report_error(Error::Subscription(error));
            Ok(())
        }
        Err(error @ Error::Subscription(SubscriptionError::Unexpected { .. })) => Err(error),
        Err(error) => Err(SubscriptionError::Unexpected {
            subscriber: subscription.subscriber().to_string(),
            message: error.to_string(),
        }
        .into()),
    }
}
