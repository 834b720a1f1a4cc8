#![allow(dead_code)]

use std::rc::Rc;

use rework::parser::parse_stylesheet;
use rework::{
    Ast, Chain, Context, DefaultErrorManager, Env, Grammar, NodeId, Phase, Plugin, Registry, Sender,
    Writer,
};

/// Owns everything an [`Env`] borrows.
pub struct Harness {
    pub ast: Ast,
    pub registry: Registry,
    pub grammar: Grammar,
    pub errors: DefaultErrorManager,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            registry: Registry::new(),
            grammar: Grammar::new(),
            errors: DefaultErrorManager::new(),
        }
    }

    pub fn register<P: Plugin>(&mut self, plugin: P) -> Rc<P> {
        let plugin = Rc::new(plugin);
        self.registry
            .register(Rc::clone(&plugin))
            .expect("plugin should register");
        plugin
    }

    /// Run `f` with a sender routed to the emitter.
    pub fn run<R>(&mut self, phase: Phase, f: impl FnOnce(&mut Sender<'_, '_>) -> R) -> R {
        let mut env = Env::new(
            &mut self.ast,
            &self.registry,
            &self.grammar,
            &mut self.errors,
            phase,
        );
        let mut sender = Sender::new(&mut env);
        f(&mut sender)
    }

    /// Run `f` with `root` as the root chain, then hand the chain back.
    pub fn rooted<R>(
        &mut self,
        root: Chain,
        f: impl FnOnce(&mut Sender<'_, '_>) -> R,
    ) -> (R, Chain) {
        let mut env = Env::new(
            &mut self.ast,
            &self.registry,
            &self.grammar,
            &mut self.errors,
            Phase::Process,
        )
        .with_root(root);
        let result = f(&mut Sender::new(&mut env));
        (result, env.take_root())
    }

    /// Run `f` with a sender that drops units at the end of its chains.
    pub fn detached<R>(&mut self, f: impl FnOnce(&mut Sender<'_, '_>) -> R) -> R {
        let mut env = Env::new(
            &mut self.ast,
            &self.registry,
            &self.grammar,
            &mut self.errors,
            Phase::Process,
        );
        let mut sender = Sender::detached(&mut env);
        f(&mut sender)
    }

    /// Run `f` with a context as a rework handler would get it.
    pub fn context<R>(&mut self, f: impl FnOnce(&mut Context<'_, '_>) -> R) -> R {
        let mut env = Env::new(
            &mut self.ast,
            &self.registry,
            &self.grammar,
            &mut self.errors,
            Phase::Process,
        );
        f(&mut Context::new(&mut env))
    }

    pub fn parse(&mut self, css: &str) -> NodeId {
        self.run(Phase::Process, |sender| parse_stylesheet(css, sender))
            .expect("stylesheet should parse")
    }

    pub fn write(&self, unit: NodeId) -> String {
        Writer::new(&self.ast).write(unit)
    }

    pub fn compressed(&self, unit: NodeId) -> String {
        Writer::new(&self.ast).compressed(true).write(unit)
    }
}
