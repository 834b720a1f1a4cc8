//! Plugins, their subscriptions and the registry that dispatches to them.
//!
//! A plugin declares its handlers in [`Plugin::subscribe`] with one of four
//! markers. The marker fixes both the phase the handler runs in and the shape
//! of the handler, so a handler that would need the wrong access to the tree
//! does not type-check:
//!
//! | marker     | phase    | handler                                                   |
//! |------------|----------|-----------------------------------------------------------|
//! | `refine`   | Refine   | `fn(&P, NodeId, &Grammar, &mut Context) -> HandlerResult` |
//! | `observe`  | Process  | `fn(&P, NodeId, &Ast) -> HandlerResult`                   |
//! | `rework`   | Process  | `fn(&P, NodeId, &mut Context) -> HandlerResult`           |
//! | `validate` | Validate | `fn(&P, NodeId, &Ast, &mut dyn ErrorManager) -> HandlerResult` |
//!
//! Subscriptions are declared against an [`EventType`]: a concrete [`Kind`] or
//! a [`Capabilities`] tag covering several kinds.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Ast, Capabilities, Kind, Node, NodeId};
use crate::context::Context;
use crate::emitter::Env;
use crate::error::{Result, SubscriptionError};
use crate::error_manager::ErrorManager;
use crate::parser::Grammar;
use crate::status::Phase;

pub type HandlerResult = Result<()>;

pub type RefineFn<P> = fn(&P, NodeId, &Grammar, &mut Context<'_, '_>) -> HandlerResult;
pub type ObserveFn<P> = fn(&P, NodeId, &Ast) -> HandlerResult;
pub type ReworkFn<P> = fn(&P, NodeId, &mut Context<'_, '_>) -> HandlerResult;
pub type ValidateFn<P> = fn(&P, NodeId, &Ast, &mut dyn ErrorManager) -> HandlerResult;

/// Subscriber code.
///
/// Handlers receive `&self`; plugins keep their own mutable state in `Cell`
/// or `RefCell`.
pub trait Plugin: 'static {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>)
    where
        Self: Sized;

    /// Name used in logs and in errors raised from this plugin's handlers.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// What a subscription is declared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Kind(Kind),
    Capability(Capabilities),
}

impl EventType {
    pub fn matches(self, kind: Kind) -> bool {
        match self {
            EventType::Kind(expected) => expected == kind,
            EventType::Capability(capabilities) => kind.capabilities().contains(capabilities),
        }
    }

    /// Every kind this event type covers.
    pub fn kinds(self) -> Vec<Kind> {
        Kind::ALL.into_iter().filter(|kind| self.matches(*kind)).collect()
    }

    pub fn is_exact(self) -> bool {
        matches!(self, EventType::Kind(_))
    }
}

impl From<Kind> for EventType {
    fn from(kind: Kind) -> Self {
        EventType::Kind(kind)
    }
}

impl From<Capabilities> for EventType {
    fn from(capabilities: Capabilities) -> Self {
        EventType::Capability(capabilities)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Kind(kind) => write!(f, "{kind}"),
            EventType::Capability(capabilities) => write!(f, "{capabilities}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    Refine,
    Observe,
    Rework,
    Validate,
}

impl Marker {
    pub fn phase(self) -> Phase {
        match self {
            Marker::Refine => Phase::Refine,
            Marker::Observe | Marker::Rework => Phase::Process,
            Marker::Validate => Phase::Validate,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Refine => write!(f, "refine"),
            Marker::Observe => write!(f, "observe"),
            Marker::Rework => write!(f, "rework"),
            Marker::Validate => write!(f, "validate"),
        }
    }
}

pub enum Handler<P> {
    Refine(RefineFn<P>),
    Observe(ObserveFn<P>),
    Rework(ReworkFn<P>),
    Validate(ValidateFn<P>),
}

impl<P> Handler<P> {
    pub fn marker(&self) -> Marker {
        match self {
            Handler::Refine(_) => Marker::Refine,
            Handler::Observe(_) => Marker::Observe,
            Handler::Rework(_) => Marker::Rework,
            Handler::Validate(_) => Marker::Validate,
        }
    }
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Handler<P> {}

/// One handler declaration, before validation.
pub struct Declared<P> {
    pub event: EventType,
    pub filter: Option<String>,
    pub handler: Handler<P>,
}

/// Builder handed to [`Plugin::subscribe`].
pub struct Subscriptions<P> {
    declared: Vec<Declared<P>>,
}

impl<P> Subscriptions<P> {
    fn new() -> Self {
        Self {
            declared: Vec::new(),
        }
    }

    fn declare(
        &mut self,
        event: EventType,
        filter: Option<&str>,
        handler: Handler<P>,
    ) -> &mut Self {
        self.declared.push(Declared {
            event,
            filter: filter.map(String::from),
            handler,
        });
        self
    }

    pub fn refine(&mut self, event: impl Into<EventType>, handler: RefineFn<P>) -> &mut Self {
        self.declare(event.into(), None, Handler::Refine(handler))
    }

    pub fn refine_named(
        &mut self,
        event: impl Into<EventType>,
        name: &str,
        handler: RefineFn<P>,
    ) -> &mut Self {
        self.declare(event.into(), Some(name), Handler::Refine(handler))
    }

    pub fn observe(&mut self, event: impl Into<EventType>, handler: ObserveFn<P>) -> &mut Self {
        self.declare(event.into(), None, Handler::Observe(handler))
    }

    pub fn observe_named(
        &mut self,
        event: impl Into<EventType>,
        name: &str,
        handler: ObserveFn<P>,
    ) -> &mut Self {
        self.declare(event.into(), Some(name), Handler::Observe(handler))
    }

    pub fn rework(&mut self, event: impl Into<EventType>, handler: ReworkFn<P>) -> &mut Self {
        self.declare(event.into(), None, Handler::Rework(handler))
    }

    pub fn rework_named(
        &mut self,
        event: impl Into<EventType>,
        name: &str,
        handler: ReworkFn<P>,
    ) -> &mut Self {
        self.declare(event.into(), Some(name), Handler::Rework(handler))
    }

    pub fn validate(&mut self, event: impl Into<EventType>, handler: ValidateFn<P>) -> &mut Self {
        self.declare(event.into(), None, Handler::Validate(handler))
    }

    pub fn validate_named(
        &mut self,
        event: impl Into<EventType>,
        name: &str,
        handler: ValidateFn<P>,
    ) -> &mut Self {
        self.declare(event.into(), Some(name), Handler::Validate(handler))
    }
}

/// Collect and check the handler declarations of `plugin`.
pub fn scan_subscriptions<P: Plugin>(
    plugin: &P,
) -> std::result::Result<Vec<Declared<P>>, SubscriptionError> {
    let mut subscriptions = Subscriptions::new();
    plugin.subscribe(&mut subscriptions);

    for declared in &subscriptions.declared {
        let kinds = declared.event.kinds();
        if let Some(filter) = &declared.filter {
            if filter.trim().is_empty() {
                return Err(SubscriptionError::EmptyNameFilter(declared.event));
            }
            if kinds.iter().any(|kind| !kind.is_named()) {
                return Err(SubscriptionError::NameFilterOnUnnamed {
                    filter: filter.clone(),
                    event_type: declared.event,
                });
            }
        }
        if declared.handler.marker() == Marker::Refine
            && kinds.iter().any(|kind| !kind.is_refinable())
        {
            return Err(SubscriptionError::RefineOnNonRefinable(declared.event));
        }
    }
    Ok(subscriptions.declared)
}

trait Invoke {
    fn invoke(&self, unit: NodeId, env: &mut Env<'_>) -> HandlerResult;
}

struct Bound<P> {
    plugin: Rc<P>,
    handler: Handler<P>,
}

impl<P: Plugin> Invoke for Bound<P> {
    fn invoke(&self, unit: NodeId, env: &mut Env<'_>) -> HandlerResult {
        let plugin: &P = &self.plugin;
        match self.handler {
            Handler::Refine(handler) => {
                let grammar = env.grammar();
                handler(plugin, unit, grammar, &mut Context::new(env))
            }
            Handler::Observe(handler) => handler(plugin, unit, env.ast()),
            Handler::Rework(handler) => handler(plugin, unit, &mut Context::new(env)),
            Handler::Validate(handler) => {
                let (ast, errors) = env.split();
                handler(plugin, unit, ast, errors)
            }
        }
    }
}

/// A registered handler bound to its plugin instance.
pub struct Subscription {
    subscriber: &'static str,
    plugin_index: usize,
    order: usize,
    event: EventType,
    filter: Option<String>,
    marker: Marker,
    invoker: Box<dyn Invoke>,
}

impl Subscription {
    pub fn subscriber(&self) -> &'static str {
        self.subscriber
    }

    pub fn event(&self) -> EventType {
        self.event
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    pub fn phase(&self) -> Phase {
        self.marker.phase()
    }

    /// Whether the name filter, if any, matches `node` (ASCII case-insensitive).
    pub fn accepts(&self, node: &Node) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => node.name().is_some_and(|name| name.eq_ignore_ascii_case(filter)),
        }
    }

    pub(crate) fn invoke(&self, unit: NodeId, env: &mut Env<'_>) -> HandlerResult {
        self.invoker.invoke(unit, env)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} on {}", self.subscriber, self.marker, self.event)?;
        if let Some(filter) = &self.filter {
            write!(f, " named `{filter}`")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({self})")
    }
}

struct Registered {
    key: *const (),
    name: &'static str,
    _plugin: Rc<dyn Any>,
}

/// Every registered subscription plus a `(Kind, Phase)` dispatch table.
///
/// Resolution order for one `(Kind, Phase)`: plugin registration order first,
/// then, within one plugin, subscriptions on the concrete kind before those on
/// a capability, then declaration order.
#[derive(Default)]
pub struct Registry {
    plugins: Vec<Registered>,
    subscriptions: Vec<Subscription>,
    table: HashMap<(Kind, Phase), Vec<usize>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin instance. Returns `false` when this very instance was
    /// registered before, in which case nothing changes.
    pub fn register<P: Plugin>(
        &mut self,
        plugin: Rc<P>,
    ) -> std::result::Result<bool, SubscriptionError> {
        let key = Rc::as_ptr(&plugin) as *const ();
        if self.plugins.iter().any(|registered| registered.key == key) {
            log::debug!("{} already registered", plugin.name());
            return Ok(false);
        }

        let declared = scan_subscriptions(&*plugin)?;
        let plugin_index = self.plugins.len();
        let name = plugin.name();
        log::debug!("registering {name} with {} subscriptions", declared.len());

        for (order, declared) in declared.into_iter().enumerate() {
            self.subscriptions.push(Subscription {
                subscriber: name,
                plugin_index,
                order,
                event: declared.event,
                filter: declared.filter,
                marker: declared.handler.marker(),
                invoker: Box::new(Bound {
                    plugin: Rc::clone(&plugin),
                    handler: declared.handler,
                }),
            });
        }
        self.plugins.push(Registered {
            key,
            name,
            _plugin: plugin,
        });
        self.rebuild();
        Ok(true)
    }

    fn rebuild(&mut self) {
        self.table.clear();
        for kind in Kind::ALL {
            for phase in Phase::ALL {
                let mut matching: Vec<usize> = self
                    .subscriptions
                    .iter()
                    .enumerate()
                    .filter(|(_, subscription)| {
                        subscription.phase() == phase && subscription.event.matches(kind)
                    })
                    .map(|(index, _)| index)
                    .collect();
                if matching.is_empty() {
                    continue;
                }
                matching.sort_by_key(|index| {
                    let subscription = &self.subscriptions[*index];
                    (
                        subscription.plugin_index,
                        !subscription.event.is_exact(),
                        subscription.order,
                    )
                });
                self.table.insert((kind, phase), matching);
            }
        }
    }

    /// Subscriptions to run for a unit of `kind` during `phase`, in order.
    pub fn resolve(&self, kind: Kind, phase: Phase) -> impl Iterator<Item = &Subscription> + '_ {
        self.table
            .get(&(kind, phase))
            .into_iter()
            .flatten()
            .map(|index| &self.subscriptions[*index])
    }

    /// Subscriptions declared exactly against `event`, in registration order.
    pub fn subscriptions_for(&self, event: impl Into<EventType>) -> Vec<&Subscription> {
        let event = event.into();
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.event == event)
            .collect()
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|registered| registered.name).collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.plugin_names())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl Plugin for Nothing {
        fn subscribe(&self, _subscriptions: &mut Subscriptions<Self>) {}
    }

    struct BadFilter;

    impl BadFilter {
        fn check(&self, _unit: NodeId, _ast: &Ast) -> HandlerResult {
            Ok(())
        }
    }

    impl Plugin for BadFilter {
        fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
            subscriptions.observe_named(Kind::ClassSelector, "a", Self::check);
        }
    }

    #[test]
    fn capability_event_types_cover_their_kinds() {
        let statement = EventType::from(Capabilities::STATEMENT);
        assert_eq!(statement.kinds(), vec![Kind::Rule, Kind::AtRule]);
        assert!(!statement.is_exact());
        assert!(EventType::from(Kind::Rule).is_exact());
    }

    #[test]
    fn same_instance_registers_once() {
        let mut registry = Registry::new();
        let plugin = Rc::new(Nothing);
        assert_eq!(registry.register(Rc::clone(&plugin)), Ok(true));
        assert_eq!(registry.register(plugin), Ok(false));
        assert_eq!(registry.plugin_names().len(), 1);
    }

    #[test]
    fn name_filter_on_unnamed_kind_is_rejected() {
        let mut registry = Registry::new();
        let error = registry.register(Rc::new(BadFilter)).unwrap_err();
        assert!(matches!(error, SubscriptionError::NameFilterOnUnnamed { .. }));
        assert!(registry.is_empty());
    }
}
