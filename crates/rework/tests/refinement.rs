//! Integration tests for lazy refinement, status tracking and dynamic edits.
//!
//! - hold / release ordering
//! - Refinement idempotence
//! - Status only moves forward
//! - Destroyed units never reach later phases
//! - Units inserted through a context are announced

mod common;

use std::cell::{Cell, RefCell};

use common::Harness;
use rework::broadcast::{QueryableBroadcaster, propagate};
use rework::parser::{Source, parse_stylesheet};
use rework::refine::{hold, refine};
use rework::{
    AutoRefiner, Ast, Chain, Context, Error, ErrorManager, Grammar, HandlerResult, Kind, Message,
    NodeId, Phase, Plugin, Status, Subscriptions, Syntax,
};

fn class_name(ast: &Ast, unit: NodeId) -> String {
    match ast.syntax(unit) {
        Syntax::ClassSelector { name } => name.clone(),
        _ => String::new(),
    }
}

fn property(ast: &Ast, unit: NodeId) -> String {
    match ast.syntax(unit) {
        Syntax::Declaration(declaration) => declaration.property.clone(),
        _ => String::new(),
    }
}

struct Classes {
    seen: RefCell<Vec<String>>,
}

impl Classes {
    fn new() -> Self {
        Self {
            seen: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, unit: NodeId, ast: &Ast) -> HandlerResult {
        self.seen.borrow_mut().push(class_name(ast, unit));
        Ok(())
    }
}

impl Plugin for Classes {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.observe(Kind::ClassSelector, Self::record);
    }
}

// ============================================================================
// HOLD AND RELEASE
// ============================================================================

#[test]
fn test_hold_releases_parent_before_children() {
    let mut harness = Harness::new();
    let grammar = Grammar::new();

    let (units, queued, released) = harness.detached(|sender| {
        let mut log = Chain::new();
        log.chain(QueryableBroadcaster::new());
        sender.push(log);

        let mut source = Source::new(".a { color: red }");
        let held = hold(sender, |sender| grammar.rule(&mut source, sender).map(|_| ())).unwrap();
        let units = held.units().to_vec();
        let queued = held.queued();
        for unit in &queued {
            assert_eq!(sender.ast().status(*unit), Status::Queued);
        }
        assert!(sender.top().unwrap().find::<QueryableBroadcaster>().unwrap().is_empty());

        held.release(sender).unwrap();
        let log = sender.pop().unwrap();
        let released: Vec<Kind> = log
            .find::<QueryableBroadcaster>()
            .unwrap()
            .units()
            .map(|unit| sender.ast().kind(unit))
            .collect();
        (units, queued, released)
    });

    assert_eq!(units.len(), 1);
    assert_eq!(harness.ast.kind(units[0]), Kind::Rule);
    assert_eq!(queued.len(), 3);
    assert_eq!(released, vec![Kind::Rule, Kind::Selector, Kind::Declaration]);
}

#[test]
fn test_hold_attaches_to_parent() {
    let mut harness = Harness::new();
    let grammar = Grammar::new();
    let root = harness.ast.create(Syntax::Stylesheet, None);

    harness.detached(|sender| {
        let mut source = Source::new("@import 'a.css'; .b { margin: 0 }");
        let held = hold(sender, |sender| grammar.statements(&mut source, sender)).unwrap();
        assert_eq!(held.units().len(), 2);
        held.attach(root, sender).unwrap();
        held.release(sender).unwrap();
    });

    let kinds: Vec<Kind> = harness
        .ast
        .children(root)
        .iter()
        .map(|unit| harness.ast.kind(*unit))
        .collect();
    assert_eq!(kinds, vec![Kind::AtRule, Kind::Rule]);
}

// ============================================================================
// REFINEMENT
// ============================================================================

#[test]
fn test_selector_list_refines_in_order() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::new().selectors());
    let classes = harness.register(Classes::new());

    harness.parse(".a, .b { color: red; }");

    assert_eq!(*classes.seen.borrow(), vec!["a", "b"]);
}

#[test]
fn test_refine_twice_changes_nothing() {
    struct Twice {
        calls: Cell<usize>,
    }

    impl Twice {
        fn first(
            &self,
            unit: NodeId,
            _grammar: &Grammar,
            cx: &mut Context<'_, '_>,
        ) -> HandlerResult {
            self.calls.set(self.calls.get() + 1);
            cx.refine(unit)?;
            Ok(())
        }

        fn second(
            &self,
            unit: NodeId,
            _grammar: &Grammar,
            cx: &mut Context<'_, '_>,
        ) -> HandlerResult {
            self.calls.set(self.calls.get() + 1);
            assert!(cx.ast().is_refined(unit));
            cx.refine(unit)?;
            Ok(())
        }
    }

    impl Plugin for Twice {
        fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
            subscriptions
                .refine(Kind::Selector, Self::first)
                .refine(Kind::Selector, Self::second);
        }
    }

    let mut harness = Harness::new();
    let twice = harness.register(Twice {
        calls: Cell::new(0),
    });
    let classes = harness.register(Classes::new());

    let root = harness.parse(".a.b { color: red }");

    assert_eq!(twice.calls.get(), 2);
    assert_eq!(*classes.seen.borrow(), vec!["a", "b"]);
    let rule = harness.ast.children(root)[0];
    let selector = harness.ast.selectors(rule)[0];
    assert_eq!(harness.ast.children(selector).len(), 2);
}

#[test]
fn test_refine_is_idempotent_outside_dispatch() {
    let mut harness = Harness::new();
    let root = harness.parse("a > b { color: red }");
    let rule = harness.ast.children(root)[0];
    let selector = harness.ast.selectors(rule)[0];
    assert!(!harness.ast.is_refined(selector));

    harness.run(Phase::Process, |sender| {
        refine(selector, sender).unwrap();
        refine(selector, sender).unwrap();
    });

    assert!(harness.ast.is_refined(selector));
    assert!(harness.ast.node(selector).raw().is_none());
    let kinds: Vec<Kind> = harness
        .ast
        .children(selector)
        .iter()
        .map(|unit| harness.ast.kind(*unit))
        .collect();
    assert_eq!(kinds, vec![Kind::TypeSelector, Kind::Combinator, Kind::TypeSelector]);
}

#[test]
fn test_refine_consumes_whole_declaration_value() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::all());

    let root = harness.parse(".a { margin: 0 auto; font: 12px/1.5 \"Helvetica Neue\", serif }");

    let rule = harness.ast.children(root)[0];
    let declarations = harness.ast.declarations(rule);
    let terms: Vec<Vec<Kind>> = declarations
        .iter()
        .map(|unit| {
            harness
                .ast
                .children(*unit)
                .iter()
                .map(|term| harness.ast.kind(*term))
                .collect()
        })
        .collect();
    assert_eq!(
        terms,
        vec![
            vec![Kind::NumericValue, Kind::KeywordValue],
            vec![
                Kind::NumericValue,
                Kind::Operator,
                Kind::NumericValue,
                Kind::StringValue,
                Kind::Operator,
                Kind::KeywordValue,
            ],
        ]
    );
    assert!(harness.errors.diagnostics().is_empty());
}

// ============================================================================
// STATUS
// ============================================================================

#[test]
fn test_every_unit_ends_processed() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::all());

    let root = harness.parse("@media print { .a { color: red } }\n.b > .c { margin: 0 }");

    for unit in harness.ast.descendants(root) {
        assert_eq!(
            harness.ast.status(unit),
            Status::Processed,
            "{} {unit}",
            harness.ast.kind(unit)
        );
    }
}

#[test]
fn test_status_never_moves_backwards() {
    let mut harness = Harness::new();
    let classes = harness.register(Classes::new());
    harness.register(AutoRefiner::new().selectors());

    let root = harness.parse(".a { color: red }");
    let part = harness
        .ast
        .descendants(root)
        .into_iter()
        .find(|unit| harness.ast.kind(*unit) == Kind::ClassSelector)
        .unwrap();
    assert_eq!(harness.ast.status(part), Status::Processed);

    harness.run(Phase::Refine, |sender| sender.broadcast(part)).unwrap();
    harness.run(Phase::Process, |sender| sender.broadcast(part)).unwrap();

    assert_eq!(harness.ast.status(part), Status::Processed);
    assert_eq!(*classes.seen.borrow(), vec!["a"]);
}

// ============================================================================
// DESTROYED UNITS
// ============================================================================

struct DropColor;

impl DropColor {
    fn drop_color(&self, unit: NodeId, cx: &mut Context<'_, '_>) -> HandlerResult {
        if property(cx.ast(), unit) == "color" {
            cx.destroy(unit);
        }
        Ok(())
    }
}

impl Plugin for DropColor {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.rework(Kind::Declaration, Self::drop_color);
    }
}

struct Validated {
    seen: RefCell<Vec<String>>,
}

impl Validated {
    fn record(&self, unit: NodeId, ast: &Ast, _errors: &mut dyn ErrorManager) -> HandlerResult {
        self.seen.borrow_mut().push(property(ast, unit));
        Ok(())
    }
}

impl Plugin for Validated {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.validate(Kind::Declaration, Self::record);
    }
}

#[test]
fn test_destroyed_in_process_is_absent_in_validate() {
    let mut harness = Harness::new();
    harness.register(DropColor);
    let validated = harness.register(Validated {
        seen: RefCell::new(Vec::new()),
    });

    let root = harness.parse(".a { color: red; margin: 0 }");
    assert!(validated.seen.borrow().is_empty());

    harness
        .run(Phase::Validate, |sender| {
            propagate(root, sender, &|status| status < Status::Validated)
        })
        .unwrap();

    assert_eq!(*validated.seen.borrow(), vec!["margin"]);
    let destroyed = harness
        .ast
        .descendants(root)
        .into_iter()
        .filter(|unit| harness.ast.node(*unit).is_destroyed())
        .count();
    assert_eq!(destroyed, 0);
}

#[test]
fn test_destroy_marks_subtree_never_emit() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::all());
    let root = harness.parse(".a { color: red }");
    let rule = harness.ast.children(root)[0];
    let below = harness.ast.descendants(rule);

    harness.context(|cx| cx.destroy(rule));

    assert!(harness.ast.children(root).is_empty());
    for unit in below {
        assert_eq!(harness.ast.status(unit), Status::NeverEmit);
    }
}

// ============================================================================
// DYNAMIC EDITS
// ============================================================================

struct AddMargin;

impl AddMargin {
    fn add(&self, unit: NodeId, cx: &mut Context<'_, '_>) -> HandlerResult {
        let declaration = cx.parse_declaration("margin: 0")?;
        cx.append(unit, declaration)
    }
}

impl Plugin for AddMargin {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.rework(Kind::Rule, Self::add);
    }
}

struct Properties {
    seen: RefCell<Vec<String>>,
}

impl Properties {
    fn record(&self, unit: NodeId, ast: &Ast) -> HandlerResult {
        self.seen.borrow_mut().push(property(ast, unit));
        Ok(())
    }
}

impl Plugin for Properties {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.observe(Kind::Declaration, Self::record);
    }
}

#[test]
fn test_appended_units_are_announced() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::all());
    harness.register(AddMargin);
    let properties = harness.register(Properties {
        seen: RefCell::new(Vec::new()),
    });

    let root = harness.parse(".a { color: red }");

    assert_eq!(*properties.seen.borrow(), vec!["margin", "color"]);
    let rule = harness.ast.children(root)[0];
    let margin = harness.ast.declarations(rule)[1];
    assert!(harness.ast.is_refined(margin));
    assert_eq!(harness.ast.status(margin), Status::Processed);
    assert_eq!(harness.write(root), ".a {\n  color: red;\n  margin: 0;\n}\n");
}

#[test]
fn test_units_under_unseen_parents_wait_for_them() {
    let mut harness = Harness::new();
    let properties = harness.register(Properties {
        seen: RefCell::new(Vec::new()),
    });

    let rule = harness.context(|cx| {
        let rule = cx.create(Syntax::Rule);
        let declaration = cx.parse_declaration("color: red").unwrap();
        cx.append(rule, declaration).unwrap();
        rule
    });
    assert!(properties.seen.borrow().is_empty());

    harness.context(|cx| cx.propagate(rule)).unwrap();
    assert_eq!(*properties.seen.borrow(), vec!["color"]);
}

#[test]
fn test_parse_selector_returns_detached_raw_unit() {
    let mut harness = Harness::new();

    let selector = harness.context(|cx| cx.parse_selector(".x > .y")).unwrap();

    let node = harness.ast.node(selector);
    assert_eq!(node.kind(), Kind::Selector);
    assert_eq!(node.parent(), None);
    assert!(!node.is_refined());
    assert_eq!(node.raw().map(|raw| raw.text.as_str()), Some(".x > .y"));
    assert_eq!(node.status(), Status::Unbroadcasted);
}

#[test]
fn test_parse_selector_rejects_lists_and_blanks() {
    let mut harness = Harness::new();

    let list = harness.context(|cx| cx.parse_selector(".a, .b")).unwrap_err();
    assert!(matches!(
        list,
        Error::Parse(ref error) if error.message == Message::UnparsableRemainder(", .b".to_string())
    ));

    let blank = harness.context(|cx| cx.parse_selector("   ")).unwrap_err();
    assert!(matches!(
        blank,
        Error::Parse(ref error) if error.message == Message::ExpectedSelector
    ));

    let declaration = harness.context(|cx| cx.parse_declaration("color")).unwrap_err();
    assert!(matches!(
        declaration,
        Error::Parse(ref error) if error.message == Message::ExpectedDeclaration
    ));
}

#[test]
fn test_stylesheet_parse_through_sender() {
    let mut harness = Harness::new();
    let root = harness
        .run(Phase::Refine, |sender| parse_stylesheet(".a { color: red }", sender))
        .unwrap();
    assert_eq!(harness.ast.status(root), Status::Refined);
}

// ============================================================================
// ROOT CHAIN
// ============================================================================

#[test]
fn test_root_chain_sees_refined_units() {
    let mut harness = Harness::new();
    harness.register(AutoRefiner::all());
    let classes = harness.register(Classes::new());

    let log = Chain::from_stages(vec![Box::new(QueryableBroadcaster::new())]);
    let (root, chain) = harness.rooted(log, |sender| {
        parse_stylesheet(".a, .b { color: red; }", sender)
    });
    let root = root.unwrap();

    let log = chain.find::<QueryableBroadcaster>().unwrap();
    assert_eq!(log.count(Kind::Selector), 2);
    assert_eq!(log.count(Kind::ClassSelector), 2);
    assert_eq!(log.count(Kind::KeywordValue), 1);
    assert_eq!(log.find(Kind::Stylesheet), Some(root));
    assert_eq!(*classes.seen.borrow(), vec!["a", "b"]);
}

#[test]
fn test_root_chain_sees_inserted_units() {
    let mut harness = Harness::new();
    harness.register(AddMargin);

    let log = Chain::from_stages(vec![Box::new(QueryableBroadcaster::new())]);
    let (root, chain) = harness.rooted(log, |sender| parse_stylesheet(".a { color: red }", sender));
    let root = root.unwrap();

    let rule = harness.ast.children(root)[0];
    let margin = harness.ast.declarations(rule)[1];
    let log = chain.find::<QueryableBroadcaster>().unwrap();
    assert_eq!(log.count(Kind::Declaration), 2);
    assert!(log.units().any(|unit| unit == margin));
}

// ============================================================================
// RE-ENTRANT BROADCASTS
// ============================================================================

struct Echo {
    calls: Cell<usize>,
}

impl Echo {
    fn echo(&self, unit: NodeId, cx: &mut Context<'_, '_>) -> HandlerResult {
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() < 5 {
            cx.broadcast(unit)?;
            cx.propagate(unit)?;
        }
        Ok(())
    }
}

impl Plugin for Echo {
    fn subscribe(&self, subscriptions: &mut Subscriptions<Self>) {
        subscriptions.rework(Kind::Rule, Self::echo);
    }
}

#[test]
fn test_unit_is_not_dispatched_while_in_flight() {
    let mut harness = Harness::new();
    let echo = harness.register(Echo {
        calls: Cell::new(0),
    });

    let root = harness.parse(".a { color: red }");

    assert_eq!(echo.calls.get(), 1);
    let rule = harness.ast.children(root)[0];
    assert_eq!(harness.ast.status(rule), Status::Processed);
}

#[test]
fn test_completed_phase_is_not_dispatched_again() {
    let mut harness = Harness::new();
    let echo = harness.register(Echo {
        calls: Cell::new(0),
    });
    let root = harness.parse(".a { color: red }");
    let rule = harness.ast.children(root)[0];

    harness.run(Phase::Process, |sender| sender.broadcast(rule)).unwrap();

    assert_eq!(echo.calls.get(), 1);
}
